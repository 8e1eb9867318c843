//! Error types for NIO registry operations.

use thiserror::Error;

/// Result type alias for NIO operations.
pub type Result<T> = std::result::Result<T, NioError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NioError {
    #[error("NIO '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("NIO '{name}' not found")]
    NotFound { name: String },

    /// The NIO still has port bindings referencing it.
    #[error("NIO '{name}' is still referenced ({refs} binding(s))")]
    InUse { name: String, refs: u32 },

    #[error("reference count underflow on NIO '{name}'")]
    RefCountUnderflow { name: String },

    #[error("invalid NIO descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },
}

impl NioError {
    pub fn invalid_descriptor(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }
}
