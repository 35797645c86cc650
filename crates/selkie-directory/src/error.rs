//! Directory error types
//!
//! TigerStyle: Explicit error variants with context.

use selkie_core::SiloAddress;
use thiserror::Error;

/// Directory-specific errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Silo not reachable
    #[error("silo {silo} not reachable: {reason}")]
    SiloUnreachable { silo: String, reason: String },

    /// RPC to a peer directory or catalog failed
    #[error("RPC to {silo} failed: {reason}")]
    RpcFailed { silo: String, reason: String },

    /// Registration of an activation failed
    #[error("registration of grain {grain} failed: {reason}")]
    RegistrationFailed { grain: String, reason: String },

    /// No partition copy held for the given silo
    #[error("no partition copy held for silo {silo}")]
    PartitionMissing { silo: String },

    /// Directory is shutting down
    #[error("directory is shutting down")]
    ShuttingDown,

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] selkie_core::Error),

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DirectoryError {
    /// Create a silo unreachable error
    pub fn silo_unreachable(silo: &SiloAddress, reason: impl Into<String>) -> Self {
        Self::SiloUnreachable {
            silo: silo.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an RPC failed error
    pub fn rpc_failed(silo: &SiloAddress, reason: impl Into<String>) -> Self {
        Self::RpcFailed {
            silo: silo.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::SiloUnreachable { .. } | Self::RpcFailed { .. }
        )
    }
}

/// Result type for directory operations
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let silo = SiloAddress::new("silo-1").unwrap();
        let err = DirectoryError::rpc_failed(&silo, "connection refused");
        assert!(err.to_string().contains("silo-1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_retriable() {
        let silo = SiloAddress::new("silo-1").unwrap();
        assert!(DirectoryError::rpc_failed(&silo, "timeout").is_retriable());
        assert!(DirectoryError::silo_unreachable(&silo, "down").is_retriable());
        assert!(!DirectoryError::ShuttingDown.is_retriable());
        assert!(!DirectoryError::internal("bug").is_retriable());
    }
}
