//! Error types for chassis operations.
//!
//! [`BayError`] covers the bay state machine and port bindings,
//! [`DriverError`] is what bay drivers report, and [`RouterError`] wraps both
//! together with persistence and configuration failures.

use cisco_nio::NioError;
use cisco_nvram::NvramError;
use cisco_types::ParseError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bay manager operations.
pub type BayResult<T> = Result<T, BayError>;

/// Result type alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors reported by bay drivers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Network modules sit behind a PCI bridge the bay must be wired to.
    #[error("no PCI bus mapping for bay {slot}")]
    NoPciMapping { slot: u32 },

    #[error("module '{device_type}' cannot be installed in bay {slot}")]
    UnsupportedBay { device_type: String, slot: u32 },

    #[error("port {port} out of range (module has {count} port(s))")]
    InvalidPort { port: u32, count: u32 },

    #[error("port {port} already has a NIO attached")]
    PortInUse { port: u32 },

    #[error("port {port} has no NIO attached")]
    PortNotAttached { port: u32 },

    #[error("{0}")]
    Failed(String),
}

/// Errors from the bay state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BayError {
    #[error("invalid slot {slot}")]
    InvalidSlot { slot: u32 },

    #[error("slot {slot} is already occupied by '{device_type}'")]
    SlotOccupied { slot: u32, device_type: String },

    #[error("slot {slot} is empty")]
    SlotEmpty { slot: u32 },

    /// The bay's runtime device is still alive.
    #[error("slot {slot} is active")]
    SlotActive { slot: u32 },

    #[error("slot {slot} is not active")]
    SlotNotActive { slot: u32 },

    #[error("unknown network module driver '{device_type}'")]
    UnknownDriver { device_type: String },

    #[error("unable to initialize '{device_type}' in slot {slot}: {source}")]
    DriverInitFailed {
        slot: u32,
        device_type: String,
        #[source]
        source: DriverError,
    },

    /// Shutdown failed; the bay has still been returned to the bound state.
    #[error("shutdown of slot {slot} failed: {source}")]
    DriverShutdownFailed {
        slot: u32,
        #[source]
        source: DriverError,
    },

    #[error("slot {slot} port {port}: driver operation failed: {source}")]
    Driver {
        slot: u32,
        port: u32,
        #[source]
        source: DriverError,
    },

    #[error("port {port} of slot {slot} is already bound")]
    DuplicatePort { slot: u32, port: u32 },

    #[error("port {port} of slot {slot} is not bound")]
    PortNotBound { slot: u32, port: u32 },

    #[error("unknown NIO '{name}'")]
    BackendNotFound { name: String },
}

impl BayError {
    pub fn invalid_slot(slot: u32) -> Self {
        Self::InvalidSlot { slot }
    }

    pub fn unknown_driver(device_type: impl Into<String>) -> Self {
        Self::UnknownDriver {
            device_type: device_type.into(),
        }
    }

    pub fn backend_not_found(name: impl Into<String>) -> Self {
        Self::BackendNotFound { name: name.into() }
    }

    /// The slot index this error refers to, if any.
    pub fn slot(&self) -> Option<u32> {
        match self {
            BayError::InvalidSlot { slot }
            | BayError::SlotOccupied { slot, .. }
            | BayError::SlotEmpty { slot }
            | BayError::SlotActive { slot }
            | BayError::SlotNotActive { slot }
            | BayError::DriverInitFailed { slot, .. }
            | BayError::DriverShutdownFailed { slot, .. }
            | BayError::Driver { slot, .. }
            | BayError::DuplicatePort { slot, .. }
            | BayError::PortNotBound { slot, .. } => Some(*slot),
            BayError::UnknownDriver { .. } | BayError::BackendNotFound { .. } => None,
        }
    }
}

/// Errors from router level operations.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Bay(#[from] BayError),

    #[error("NVRAM: {0}")]
    Nvram(#[from] NvramError),

    #[error("NIO: {0}")]
    Nio(#[from] NioError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A NIO binding description could not be understood.
    #[error("invalid NIO binding '{desc}': {reason}")]
    InvalidNioBinding { desc: String, reason: String },

    /// A line of a saved bay configuration could not be replayed.
    #[error("line {line}: {reason}")]
    InvalidCommand { line: usize, reason: String },

    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RouterError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bay_error_display() {
        assert_eq!(BayError::invalid_slot(7).to_string(), "invalid slot 7");
        assert_eq!(
            BayError::SlotOccupied {
                slot: 1,
                device_type: "NM-1FE-TX".to_string()
            }
            .to_string(),
            "slot 1 is already occupied by 'NM-1FE-TX'"
        );
        assert_eq!(
            BayError::DriverInitFailed {
                slot: 2,
                device_type: "NM-4T".to_string(),
                source: DriverError::NoPciMapping { slot: 2 },
            }
            .to_string(),
            "unable to initialize 'NM-4T' in slot 2: no PCI bus mapping for bay 2"
        );
    }

    #[test]
    fn test_bay_error_slot() {
        assert_eq!(BayError::PortNotBound { slot: 1, port: 3 }.slot(), Some(1));
        assert_eq!(BayError::unknown_driver("NM-X").slot(), None);
    }

    #[test]
    fn test_router_error_wraps_bay_error() {
        let err: RouterError = BayError::SlotEmpty { slot: 2 }.into();
        assert_eq!(err.to_string(), "slot 2 is empty");
    }
}
