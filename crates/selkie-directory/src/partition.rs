//! Directory partition data model
//!
//! TigerStyle: Explicit dictionary operations with single-activation
//! guarantee.
//!
//! A partition maps grain IDs to their registration records. The handoff
//! manager moves whole partitions (or split halves of them) between silos;
//! the operations here are the vocabulary it speaks: replace (`set`), delta
//! apply (`update`), reconciling union (`merge`), predicate extraction
//! (`split`), and the single-activation registration the host directory
//! performs.

use selkie_core::constants::{GRAIN_ACTIVATIONS_COUNT_MAX, PARTITION_GRAINS_COUNT_MAX};
use selkie_core::{ActivationId, GrainAddress, GrainId, SiloAddress};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

// =============================================================================
// GrainActivation / GrainInfo
// =============================================================================

/// One registered activation of a grain
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GrainActivation {
    /// The activation instance
    pub activation: ActivationId,
    /// The silo hosting it
    pub silo: SiloAddress,
}

impl GrainActivation {
    /// Create a new activation record
    pub fn new(activation: ActivationId, silo: SiloAddress) -> Self {
        Self { activation, silo }
    }
}

/// Partition-local record for one grain
///
/// Single-activation grains hold exactly one activation when healthy; a
/// merge of two divergent partitions is where a second one surfaces and one
/// of the two must lose. Multi-activation grains (stateless workers) hold
/// any number and never conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrainInfo {
    /// Registered activations
    activations: Vec<GrainActivation>,
    /// Registration rank; higher wins a merge conflict
    version: u64,
    /// Whether this grain enforces single activation
    single_activation: bool,
}

impl GrainInfo {
    /// Create a single-activation record
    pub fn new_single(activation: ActivationId, silo: SiloAddress, version: u64) -> Self {
        Self {
            activations: vec![GrainActivation::new(activation, silo)],
            version,
            single_activation: true,
        }
    }

    /// Create a multi-activation record
    pub fn new_multi(activations: Vec<GrainActivation>, version: u64) -> Self {
        Self {
            activations,
            version,
            single_activation: false,
        }
    }

    /// Registration rank of this record
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether this record enforces single activation
    pub fn is_single_activation(&self) -> bool {
        self.single_activation
    }

    /// The registered activations
    pub fn activations(&self) -> &[GrainActivation] {
        &self.activations
    }

    /// Full addresses of every activation in this record
    pub fn addresses(&self, grain: &GrainId) -> Vec<GrainAddress> {
        self.activations
            .iter()
            .map(|a| GrainAddress::new(grain.clone(), a.silo.clone(), a.activation.clone()))
            .collect()
    }

    /// The winning address of a single-activation record, if any
    pub fn primary_address(&self, grain: &GrainId) -> Option<GrainAddress> {
        self.activations
            .first()
            .map(|a| GrainAddress::new(grain.clone(), a.silo.clone(), a.activation.clone()))
    }

    /// Merge conflict rule: higher version wins; on a tie the record hosted
    /// on the greater silo address wins. A record with no activations never
    /// outranks one that has some.
    fn outranks(&self, other: &GrainInfo) -> bool {
        match (self.activations.first(), other.activations.first()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(mine), Some(theirs)) => {
                if self.version != other.version {
                    self.version > other.version
                } else {
                    mine.silo > theirs.silo
                }
            }
        }
    }

    /// Union another record's activations into this one (multi-activation)
    fn absorb(&mut self, other: GrainInfo) {
        for activation in other.activations {
            if !self.activations.contains(&activation) {
                self.activations.push(activation);
            }
        }
        debug_assert!(self.activations.len() <= GRAIN_ACTIVATIONS_COUNT_MAX);
        self.version = self.version.max(other.version);
    }
}

// =============================================================================
// DirectoryPartition
// =============================================================================

/// Losing activations of a merge, grouped by the silo hosting them
pub type DuplicateActivations = HashMap<SiloAddress, Vec<GrainAddress>>;

/// A directory partition: the mapping from grain ID to registration record
///
/// Owned by exactly one silo at a time in the authoritative map; peers may
/// hold copies. All mutation goes through the owning manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryPartition {
    entries: HashMap<GrainId, GrainInfo>,
    /// Monotonic rank handed to local registrations
    next_version: u64,
}

impl DirectoryPartition {
    /// Create an empty partition
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a partition from existing entries
    pub fn from_entries(entries: HashMap<GrainId, GrainInfo>) -> Self {
        let next_version = entries.values().map(GrainInfo::version).max().unwrap_or(0);
        Self {
            entries,
            next_version,
        }
    }

    /// Number of grains in the partition
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the partition holds no grains
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the partition holds the given grain
    pub fn contains(&self, grain: &GrainId) -> bool {
        self.entries.contains_key(grain)
    }

    /// Look up the record for a grain
    pub fn get(&self, grain: &GrainId) -> Option<&GrainInfo> {
        self.entries.get(grain)
    }

    /// Clone of the entry map, as shipped in handoff messages
    pub fn snapshot(&self) -> HashMap<GrainId, GrainInfo> {
        self.entries.clone()
    }

    /// Replace all entries with the given map (full-copy handoff)
    pub fn set(&mut self, entries: HashMap<GrainId, GrainInfo>) {
        self.entries = entries;
    }

    /// Apply a delta: each incoming record supersedes the existing one
    pub fn update(&mut self, entries: HashMap<GrainId, GrainInfo>) {
        for (grain, info) in entries {
            self.entries.insert(grain, info);
        }
    }

    /// Remove the entry for a grain if present; idempotent
    pub fn remove(&mut self, grain: &GrainId) {
        self.entries.remove(grain);
    }

    /// Incorporate another partition into this one
    ///
    /// Keys held by only one side transfer unchanged. When both sides hold a
    /// single-activation record for the same grain, the higher-ranked record
    /// wins (see [`GrainInfo::version`]; ties break toward the greater silo
    /// address) and the loser's addresses are returned grouped by hosting
    /// silo, for the caller to destroy. Multi-activation records union their
    /// activation lists and produce no losers.
    pub fn merge(&mut self, other: DirectoryPartition) -> DuplicateActivations {
        let mut duplicates = DuplicateActivations::new();

        for (grain, incoming) in other.entries {
            match self.entries.entry(grain) {
                Entry::Vacant(vacant) => {
                    vacant.insert(incoming);
                }
                Entry::Occupied(mut occupied) => {
                    let grain = occupied.key().clone();
                    let existing = occupied.get_mut();

                    if !existing.single_activation || !incoming.single_activation {
                        existing.absorb(incoming);
                        continue;
                    }

                    let loser = if incoming.outranks(existing) {
                        std::mem::replace(existing, incoming)
                    } else {
                        incoming
                    };

                    let winner_addresses = existing.addresses(&grain);
                    for address in loser.addresses(&grain) {
                        // The same address on both sides is not a duplicate;
                        // destroying it would kill the winner.
                        if winner_addresses.contains(&address) {
                            continue;
                        }
                        duplicates
                            .entry(address.silo.clone())
                            .or_default()
                            .push(address);
                    }
                }
            }
        }

        self.next_version = self.next_version.max(other.next_version);
        duplicates
    }

    /// Extract the entries whose grain satisfies the predicate
    ///
    /// When `modify_original` is true the extracted entries are removed from
    /// this partition (ownership split); otherwise this partition is left
    /// unchanged (copy split).
    pub fn split<F>(&mut self, predicate: F, modify_original: bool) -> DirectoryPartition
    where
        F: Fn(&GrainId) -> bool,
    {
        let selected: HashMap<GrainId, GrainInfo> = if modify_original {
            let keys: Vec<GrainId> = self
                .entries
                .keys()
                .filter(|grain| predicate(grain))
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|grain| {
                    self.entries
                        .remove(&grain)
                        .map(|info| (grain, info))
                })
                .collect()
        } else {
            self.entries
                .iter()
                .filter(|(grain, _)| predicate(grain))
                .map(|(grain, info)| (grain.clone(), info.clone()))
                .collect()
        };

        DirectoryPartition::from_entries(selected)
    }

    /// Addresses of the single-activation subset; order irrelevant
    pub fn to_list(&self) -> Vec<GrainAddress> {
        self.entries
            .iter()
            .filter(|(_, info)| info.single_activation)
            .flat_map(|(grain, info)| info.addresses(grain))
            .collect()
    }

    /// Register an activation with first-writer-wins semantics
    ///
    /// Returns the winning address: the caller's if the grain was free, the
    /// already-registered one otherwise. Re-registering the current winner
    /// returns it unchanged, so the operation is idempotent.
    pub fn register_single_activation(&mut self, address: GrainAddress) -> GrainAddress {
        if let Some(existing) = self.entries.get(&address.grain) {
            if existing.single_activation {
                if let Some(winner) = existing.primary_address(&address.grain) {
                    return winner;
                }
            }
        }

        debug_assert!(self.entries.len() < PARTITION_GRAINS_COUNT_MAX);
        self.next_version += 1;
        let info = GrainInfo::new_single(
            address.activation.clone(),
            address.silo.clone(),
            self.next_version,
        );
        self.entries.insert(address.grain.clone(), info);
        address
    }
}
