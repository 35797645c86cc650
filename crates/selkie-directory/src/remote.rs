//! Remote directory and catalog seams
//!
//! TigerStyle: Explicit trait seams with structural messages.
//!
//! The handoff manager never opens a connection itself; it speaks to peers
//! through these traits. Messages are structural (typed maps and lists), not
//! serialized blobs; transports decide the wire format. Timeouts are the
//! transport's responsibility, not the caller's.

use crate::error::DirectoryResult;
use crate::partition::GrainInfo;
use async_trait::async_trait;
use selkie_core::{GrainAddress, GrainId, SiloAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Why an activation is being destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    /// The activation lost a registration race; another silo holds the winner
    DuplicateActivation,
    /// The hosting silo is shutting down
    ShuttingDown,
}

impl fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateActivation => write!(f, "duplicate_activation"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

/// Per-peer directory RPC surface
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Hand the target the directory entries whose ownership moved to it
    ///
    /// Receivers must treat this as idempotent: a retry after a partial
    /// failure resends the full list.
    async fn accept_split_partition(
        &self,
        target: &SiloAddress,
        addresses: Vec<GrainAddress>,
    ) -> DirectoryResult<()>;

    /// Ship a copy of `source`'s partition to `target`, full or delta
    async fn accept_handoff_partition(
        &self,
        target: &SiloAddress,
        source: &SiloAddress,
        entries: HashMap<GrainId, GrainInfo>,
        is_full_copy: bool,
    ) -> DirectoryResult<()>;

    /// Tell `target` to drop the copy it holds for `source`
    async fn remove_handoff_partition(
        &self,
        target: &SiloAddress,
        source: &SiloAddress,
    ) -> DirectoryResult<()>;
}

/// Per-peer catalog RPC surface
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Destroy the given activations on the target silo
    async fn delete_activations(
        &self,
        target: &SiloAddress,
        addresses: Vec<GrainAddress>,
        reason: DeactivationReason,
        message: &str,
    ) -> DirectoryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deactivation_reason_display() {
        assert_eq!(
            DeactivationReason::DuplicateActivation.to_string(),
            "duplicate_activation"
        );
        assert_eq!(
            DeactivationReason::ShuttingDown.to_string(),
            "shutting_down"
        );
    }
}
