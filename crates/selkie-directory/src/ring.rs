//! Consistent-ring topology view
//!
//! TigerStyle: Read-only trait seam; deterministic seeded hashing.
//!
//! The handoff manager never computes the ring itself; it asks a [`RingView`]
//! for neighbors and grain ownership. Queries must answer for silos that are
//! not (or no longer) members, by hash position: the silo-removed handler
//! asks for the predecessors of a silo that just left.

use rapidhash::RapidHasher;
use selkie_core::{GrainId, SiloAddress};
use std::collections::BTreeSet;
use std::hash::Hasher;
use std::sync::RwLock;

/// Seed for ring position hashing; fixed so every silo computes the same ring
const RING_HASH_SEED: u64 = 0x5e1_c1e_d1_0b7;

/// Ring position of an arbitrary key
pub fn ring_hash(key: &[u8]) -> u64 {
    let mut hasher = RapidHasher::new(RING_HASH_SEED);
    hasher.write(key);
    hasher.finish()
}

// =============================================================================
// RingView
// =============================================================================

/// The topology surface the handoff manager consumes
///
/// Implementations are read-only from the manager's perspective; membership
/// mutation happens elsewhere and the manager only reacts to the events it
/// is handed.
pub trait RingView: Send + Sync {
    /// This silo's address
    fn my_address(&self) -> SiloAddress;

    /// Up to `count` silos immediately preceding `silo` on the ring,
    /// nearest first; `silo` itself is never included
    fn find_predecessors(&self, silo: &SiloAddress, count: usize) -> Vec<SiloAddress>;

    /// Up to `count` silos immediately succeeding `silo` on the ring,
    /// nearest first; `silo` itself is never included
    fn find_successors(&self, silo: &SiloAddress, count: usize) -> Vec<SiloAddress>;

    /// The silo owning the given grain's directory entry, if the ring is
    /// non-empty
    fn owner_of(&self, grain: &GrainId) -> Option<SiloAddress>;
}

// =============================================================================
// MemoryRing
// =============================================================================

/// In-memory ring over an explicit membership set
///
/// Suitable for tests and single-process deployment. Positions are seeded
/// rapidhash values of the silo address; ties order by address so two silos
/// can never shadow each other.
pub struct MemoryRing {
    my_address: SiloAddress,
    positions: RwLock<BTreeSet<(u64, SiloAddress)>>,
}

impl MemoryRing {
    /// Create a ring containing only this silo
    pub fn new(my_address: SiloAddress) -> Self {
        let mut positions = BTreeSet::new();
        positions.insert((ring_hash(my_address.ring_key_bytes()), my_address.clone()));
        Self {
            my_address,
            positions: RwLock::new(positions),
        }
    }

    /// Add a silo to the membership
    pub fn add_silo(&self, silo: SiloAddress) {
        let mut positions = self.positions.write().expect("poisoned");
        positions.insert((ring_hash(silo.ring_key_bytes()), silo));
    }

    /// Remove a silo from the membership; idempotent
    pub fn remove_silo(&self, silo: &SiloAddress) {
        let mut positions = self.positions.write().expect("poisoned");
        positions.remove(&(ring_hash(silo.ring_key_bytes()), silo.clone()));
    }

    /// Current members in ring order
    pub fn members(&self) -> Vec<SiloAddress> {
        let positions = self.positions.read().expect("poisoned");
        positions.iter().map(|(_, silo)| silo.clone()).collect()
    }

    /// Walk the ring from the given silo's position
    fn neighbors(&self, silo: &SiloAddress, count: usize, forward: bool) -> Vec<SiloAddress> {
        let positions = self.positions.read().expect("poisoned");
        let entries: Vec<&(u64, SiloAddress)> = positions.iter().collect();
        let n = entries.len();
        if n == 0 || count == 0 {
            return Vec::new();
        }

        let pivot = (ring_hash(silo.ring_key_bytes()), silo.clone());
        let mut result = Vec::with_capacity(count.min(n));

        if forward {
            // First entry strictly after the pivot, wrapping.
            let start = entries.partition_point(|e| **e <= pivot);
            for i in 0..n {
                let (_, candidate) = entries[(start + i) % n];
                if candidate == silo {
                    continue;
                }
                result.push(candidate.clone());
                if result.len() == count {
                    break;
                }
            }
        } else {
            // First entry strictly before the pivot, walking backwards.
            let start = entries.partition_point(|e| **e < pivot);
            for i in 1..=n {
                let (_, candidate) = entries[(start + n - i) % n];
                if candidate == silo {
                    continue;
                }
                result.push(candidate.clone());
                if result.len() == count {
                    break;
                }
            }
        }

        result
    }
}

impl RingView for MemoryRing {
    fn my_address(&self) -> SiloAddress {
        self.my_address.clone()
    }

    fn find_predecessors(&self, silo: &SiloAddress, count: usize) -> Vec<SiloAddress> {
        self.neighbors(silo, count, false)
    }

    fn find_successors(&self, silo: &SiloAddress, count: usize) -> Vec<SiloAddress> {
        self.neighbors(silo, count, true)
    }

    fn owner_of(&self, grain: &GrainId) -> Option<SiloAddress> {
        let positions = self.positions.read().expect("poisoned");
        if positions.is_empty() {
            return None;
        }
        let h = ring_hash(grain.ring_key_bytes());
        // Owner is the silo whose position immediately succeeds the grain's
        // hash, wrapping past the top of the ring.
        positions
            .iter()
            .find(|(pos, _)| *pos >= h)
            .or_else(|| positions.iter().next())
            .map(|(_, silo)| silo.clone())
    }
}
