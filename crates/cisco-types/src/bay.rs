//! Bay description parsing (`"1:NM-1FE-TX"`).

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A device type requested for a chassis bay.
///
/// # Examples
///
/// ```
/// use cisco_types::BayDescription;
///
/// let desc: BayDescription = "1:NM-1FE-TX".parse().unwrap();
/// assert_eq!(desc.slot, 1);
/// assert_eq!(desc.device_type, "NM-1FE-TX");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BayDescription {
    pub slot: u32,
    pub device_type: String,
}

impl BayDescription {
    pub fn new(slot: u32, device_type: impl Into<String>) -> Self {
        Self {
            slot,
            device_type: device_type.into(),
        }
    }
}

impl fmt::Display for BayDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.device_type)
    }
}

impl FromStr for BayDescription {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slot, device_type) = s
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidBayDescription(s.to_string()))?;

        let device_type = device_type.trim();
        if device_type.is_empty() || device_type.contains(':') {
            return Err(ParseError::InvalidBayDescription(s.to_string()));
        }

        let slot = slot
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidNumber(slot.to_string()))?;

        Ok(Self::new(slot, device_type))
    }
}

impl TryFrom<String> for BayDescription {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BayDescription> for String {
    fn from(desc: BayDescription) -> String {
        desc.to_string()
    }
}
