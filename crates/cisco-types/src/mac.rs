//! MAC address type with Unix and Cisco notations.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// # Examples
///
/// ```
/// use cisco_types::MacAddress;
///
/// let mac: MacAddress = "c2:00:12:34:00:00".parse().unwrap();
/// assert_eq!(mac.to_string(), "c2:00:12:34:00:00");
///
/// // IOS style dotted notation
/// let dotted: MacAddress = "c200.1234.0000".parse().unwrap();
/// assert_eq!(mac, dotted);
/// assert_eq!(mac.cisco_notation(), "c200.1234.0000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The zero/null MAC address (00:00:00:00:00:00).
    pub const ZERO: MacAddress = MacAddress([0, 0, 0, 0, 0, 0]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Returns true if the group bit of the first octet is set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Formats the address the way IOS prints it (`aabb.ccdd.eeff`).
    pub fn cisco_notation(&self) -> String {
        format!(
            "{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }

    fn parse_dotted(s: &str) -> Option<[u8; 6]> {
        let groups: Vec<&str> = s.split('.').collect();
        if groups.len() != 3 {
            return None;
        }

        let mut bytes = [0u8; 6];
        for (i, group) in groups.iter().enumerate() {
            if group.len() != 4 {
                return None;
            }
            let word = u16::from_str_radix(group, 16).ok()?;
            bytes[i * 2..i * 2 + 2].copy_from_slice(&word.to_be_bytes());
        }
        Some(bytes)
    }

    fn parse_separated(s: &str, separator: char) -> Option<[u8; 6]> {
        let parts: Vec<&str> = s.split(separator).collect();
        if parts.len() != 6 {
            return None;
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() || part.len() > 2 {
                return None;
            }
            bytes[i] = u8::from_str_radix(part, 16).ok()?;
        }
        Some(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = if s.contains('.') {
            Self::parse_dotted(s)
        } else if s.contains(':') {
            Self::parse_separated(s, ':')
        } else {
            Self::parse_separated(s, '-')
        };

        bytes
            .map(MacAddress)
            .ok_or_else(|| ParseError::InvalidMacAddress(s.to_string()))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(mac: MacAddress) -> [u8; 6] {
        mac.0
    }
}
