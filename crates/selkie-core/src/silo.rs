//! Silo identity and liveness status
//!
//! TigerStyle: Explicit silo lifecycle with validated identifiers.

use crate::constants::SILO_ADDRESS_LENGTH_BYTES_MAX;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SiloAddress
// =============================================================================

/// Unique identifier for a peer silo
///
/// Silo addresses are stable for the lifetime of a silo process and totally
/// ordered; the ordering is used as the deterministic tie-break when two
/// partitions disagree about a registration.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SiloAddress(String);

impl SiloAddress {
    /// Create a new SiloAddress with validation
    ///
    /// # Errors
    /// Returns error if the address is empty, too long, or contains invalid
    /// characters.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();

        if address.is_empty() {
            return Err(Error::InvalidSiloAddress {
                address,
                reason: "silo address cannot be empty".into(),
            });
        }

        if address.len() > SILO_ADDRESS_LENGTH_BYTES_MAX {
            return Err(Error::InvalidSiloAddress {
                address: address.clone(),
                reason: format!(
                    "silo address length {} exceeds limit {}",
                    address.len(),
                    SILO_ADDRESS_LENGTH_BYTES_MAX
                ),
            });
        }

        let valid = address
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':');

        if !valid {
            return Err(Error::InvalidSiloAddress {
                address,
                reason: "silo address contains invalid characters".into(),
            });
        }

        Ok(Self(address))
    }

    /// Create a SiloAddress without validation (for internal use)
    ///
    /// # Safety
    /// Caller must ensure the address is valid.
    #[doc(hidden)]
    pub fn new_unchecked(address: String) -> Self {
        debug_assert!(!address.is_empty());
        debug_assert!(address.len() <= SILO_ADDRESS_LENGTH_BYTES_MAX);
        Self(address)
    }

    /// Get the silo address as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes hashed onto the ring for this silo's position
    pub fn ring_key_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SiloAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SiloAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// SiloStatus
// =============================================================================

/// Approximate liveness status of a silo, as reported by the status oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiloStatus {
    /// Silo is joining the cluster
    Joining,
    /// Silo is active and serving
    Active,
    /// Silo is shutting down gracefully
    ShuttingDown,
    /// Silo is dead or declared dead
    Dead,
}

impl SiloStatus {
    /// Check whether the silo can be sent directory traffic
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check whether the silo is terminally gone
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dead)
    }
}

impl fmt::Display for SiloStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joining => write!(f, "joining"),
            Self::Active => write!(f, "active"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Dead => write!(f, "dead"),
        }
    }
}
