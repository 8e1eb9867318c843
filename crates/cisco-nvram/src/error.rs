//! Error types for NVRAM, EEPROM and storage region operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for NVRAM operations.
pub type Result<T> = std::result::Result<T, NvramError>;

#[derive(Debug, Error)]
pub enum NvramError {
    /// The region is too small for the header or for the text it announces.
    #[error("NVRAM region too small: need {needed} bytes, have {available}")]
    TruncatedRegion { needed: usize, available: usize },

    /// Empty or foreign region.
    #[error("unable to find IOS magic numbers (0x{magic1:04x}, 0x{magic2:04x})")]
    BadMagic { magic1: u16, magic2: u16 },

    #[error("configuration of {len} bytes does not fit in a {capacity} byte NVRAM copy")]
    ConfigTooLarge { len: usize, capacity: usize },

    #[error("unsupported EEPROM version {0}")]
    UnsupportedEepromVersion(u8),

    #[error("EEPROM field 0x{field_type:02x} not found")]
    EepromFieldNotFound { field_type: u8 },

    #[error("EEPROM offset {offset} out of range ({len} bytes)")]
    EepromOutOfRange { offset: usize, len: usize },

    #[error("storage region '{tag}' not found")]
    RegionNotFound { tag: String },

    #[error("storage region I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl NvramError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
