//! Error types for Selkie
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for Selkie core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Selkie core error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grain ID: {id}, reason: {reason}")]
    InvalidGrainId { id: String, reason: String },

    #[error("Grain ID too long: {length} bytes exceeds limit of {limit} bytes")]
    GrainIdTooLong { length: usize, limit: usize },

    #[error("Invalid activation ID: {id}, reason: {reason}")]
    InvalidActivationId { id: String, reason: String },

    #[error("Invalid silo address: {address}, reason: {reason}")]
    InvalidSiloAddress { address: String, reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidGrainId {
            id: "a b".into(),
            reason: "contains whitespace".into(),
        };
        assert!(err.to_string().contains("a b"));
        assert!(err.to_string().contains("whitespace"));
    }
}
