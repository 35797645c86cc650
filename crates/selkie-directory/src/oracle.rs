//! Silo liveness oracle
//!
//! TigerStyle: Read-only trait seam; approximate answers by design.
//!
//! Liveness is approximate: the oracle reports the local view, which may lag
//! reality. The handoff manager only uses it to skip talking to silos it
//! believes are gone; a stale answer costs a wasted RPC or a deferred
//! cleanup, never correctness.

use selkie_core::{SiloAddress, SiloStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// The liveness surface the handoff manager consumes
pub trait SiloStatusOracle: Send + Sync {
    /// Approximate status of one silo; unknown silos report as dead
    fn silo_status(&self, silo: &SiloAddress) -> SiloStatus;

    /// Approximate statuses of all known silos
    fn silo_statuses(&self, active_only: bool) -> HashMap<SiloAddress, SiloStatus>;
}

/// In-memory status oracle
///
/// Suitable for tests and single-process deployment; statuses are set
/// explicitly by whoever drives membership.
#[derive(Debug, Default)]
pub struct MemoryStatusOracle {
    statuses: RwLock<HashMap<SiloAddress, SiloStatus>>,
}

impl MemoryStatusOracle {
    /// Create an empty oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a silo's status
    pub fn set_status(&self, silo: SiloAddress, status: SiloStatus) {
        let mut statuses = self.statuses.write().expect("poisoned");
        statuses.insert(silo, status);
    }

    /// Forget a silo entirely
    pub fn forget(&self, silo: &SiloAddress) {
        let mut statuses = self.statuses.write().expect("poisoned");
        statuses.remove(silo);
    }
}

impl SiloStatusOracle for MemoryStatusOracle {
    fn silo_status(&self, silo: &SiloAddress) -> SiloStatus {
        let statuses = self.statuses.read().expect("poisoned");
        statuses.get(silo).copied().unwrap_or(SiloStatus::Dead)
    }

    fn silo_statuses(&self, active_only: bool) -> HashMap<SiloAddress, SiloStatus> {
        let statuses = self.statuses.read().expect("poisoned");
        statuses
            .iter()
            .filter(|(_, status)| !active_only || status.is_active())
            .map(|(silo, status)| (silo.clone(), *status))
            .collect()
    }
}
