//! Error types for steward-resource

use thiserror::Error;

/// Errors raised by provider capability calls.
///
/// These are recoverable from the transaction's point of view: a failing
/// provider call marks one resource as failed and prunes its dependents,
/// it never aborts the run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for '{property}': {message}")]
    InvalidValue { property: String, message: String },

    #[error("no such property '{property}'")]
    UnknownProperty { property: String },

    #[error("command '{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("{0}")]
    Failure(String),
}

impl ProviderError {
    /// Convenience constructor for invalid property values.
    pub fn invalid_value(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.into(),
            message: message.into(),
        }
    }
}
