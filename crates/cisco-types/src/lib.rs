//! Common types shared by the router emulation crates.
//!
//! - [`MacAddress`]: 48-bit Ethernet addresses, accepting both the Unix
//!   (`aa:bb:cc:dd:ee:ff`) and Cisco (`aabb.ccdd.eeff`) notations
//! - [`BayDescription`]: a `slot:device_type` pair as typed on a command line

mod bay;
mod mac;

pub use bay::BayDescription;
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid bay description: {0}")]
    InvalidBayDescription(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}
