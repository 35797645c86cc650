//! Grain identity types
//!
//! TigerStyle: Explicit types, validated on construction, immutable after.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::silo::SiloAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// GrainId
// =============================================================================

/// Unique identifier for a grain
///
/// Grain IDs are opaque to the directory: they are hashed onto the ring to
/// determine ownership and used as partition keys. They should be stable for
/// the lifetime of the logical grain.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GrainId(String);

impl GrainId {
    /// Create a new GrainId with validation
    ///
    /// # Errors
    /// Returns error if the id is empty, too long, or contains invalid characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidGrainId {
                id,
                reason: "grain ID cannot be empty".into(),
            });
        }

        if id.len() > GRAIN_ID_LENGTH_BYTES_MAX {
            return Err(Error::GrainIdTooLong {
                length: id.len(),
                limit: GRAIN_ID_LENGTH_BYTES_MAX,
            });
        }

        let valid = id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/');

        if !valid {
            return Err(Error::InvalidGrainId {
                id,
                reason: "grain ID contains invalid characters".into(),
            });
        }

        Ok(Self(id))
    }

    /// Create a GrainId without validation (for internal use)
    ///
    /// # Safety
    /// Caller must ensure the ID is valid.
    #[doc(hidden)]
    pub fn new_unchecked(id: String) -> Self {
        debug_assert!(!id.is_empty());
        debug_assert!(id.len() <= GRAIN_ID_LENGTH_BYTES_MAX);
        Self(id)
    }

    /// Get the grain ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes hashed onto the ring for ownership placement
    pub fn ring_key_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for GrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for GrainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ActivationId
// =============================================================================

/// Identifier of one activation of a grain
///
/// Two activations of the same grain on the same silo are distinguished by
/// their activation ID; the full `GrainAddress` tuple is what registration
/// races compare.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ActivationId(String);

impl ActivationId {
    /// Create a new ActivationId with validation
    ///
    /// # Errors
    /// Returns error if the id is empty or too long.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidActivationId {
                id,
                reason: "activation ID cannot be empty".into(),
            });
        }

        if id.len() > ACTIVATION_ID_LENGTH_BYTES_MAX {
            return Err(Error::InvalidActivationId {
                id: id.clone(),
                reason: format!(
                    "activation ID length {} exceeds limit {}",
                    id.len(),
                    ACTIVATION_ID_LENGTH_BYTES_MAX
                ),
            });
        }

        Ok(Self(id))
    }

    /// Get the activation ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// GrainAddress
// =============================================================================

/// A registered activation: one grain, activated on one silo
///
/// Equality is on the full tuple; two addresses for the same grain on the
/// same silo still differ if the activation differs. This is what a
/// registration race compares when picking a winner.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GrainAddress {
    /// The grain this activation embodies
    pub grain: GrainId,
    /// The silo hosting the activation
    pub silo: SiloAddress,
    /// The activation instance
    pub activation: ActivationId,
}

impl GrainAddress {
    /// Create a new grain address
    pub fn new(grain: GrainId, silo: SiloAddress, activation: ActivationId) -> Self {
        Self {
            grain,
            silo,
            activation,
        }
    }
}

impl fmt::Display for GrainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.grain, self.silo, self.activation)
    }
}
