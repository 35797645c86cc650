//! Directory partition handoff manager
//!
//! TigerStyle: Synchronous event mutation, queued side effects, bounded
//! retry.
//!
//! When ring membership changes, directory partitions have to be split,
//! merged, and shipped between neighbor silos while registrations keep
//! arriving. This manager drives that reconfiguration. Event handlers run
//! synchronously under the manager mutex and never suspend; every outbound
//! effect (shipping a split, unregistering a follower, destroying a
//! duplicate activation) goes through the [`OperationQueue`], whose single
//! consumer serializes and retries it.
//!
//! The reconfiguration is locally decidable: every silo reacts to the same
//! membership event against the same ring and adjusts its own copies, with
//! no cross-silo coordination. The price is registration races, which the
//! duplicate reconciler settles by destroying the losing activation.

use crate::config::HandoffConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::oracle::SiloStatusOracle;
use crate::partition::{DirectoryPartition, DuplicateActivations, GrainInfo};
use crate::queue::{OpAction, OperationQueue};
use crate::remote::{CatalogClient, DeactivationReason, RemoteDirectory};
use crate::ring::RingView;
use async_trait::async_trait;
use futures::future::join_all;
use selkie_core::{GrainAddress, GrainId, SiloAddress, TimeProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The host-directory surface the manager consumes
///
/// `is_running` gates every queued operation: once the directory reports
/// stopped, queued work exits early instead of talking to peers.
#[async_trait]
pub trait LocalRegistrar: Send + Sync {
    /// Whether the host directory is still serving
    fn is_running(&self) -> bool;

    /// Register an activation with single-activation semantics, returning
    /// the winning address (the caller's, or the one that beat it)
    async fn register_single_activation(
        &self,
        address: GrainAddress,
    ) -> DirectoryResult<GrainAddress>;
}

/// State guarded by the manager mutex
///
/// The mutex is never held across an await; queued operations re-acquire it
/// for their short synchronous sections.
struct HandoffState {
    /// Copies of peer partitions this silo mirrors, by source silo
    mirrored: HashMap<SiloAddress, DirectoryPartition>,
    /// Peer silos currently mirroring our partition, in registration order
    followers: Vec<SiloAddress>,
}

/// Collaborators a queued operation carries into its attempts
#[derive(Clone)]
struct OpContext {
    local: Arc<Mutex<DirectoryPartition>>,
    queue: Arc<OperationQueue>,
    oracle: Arc<dyn SiloStatusOracle>,
    registrar: Arc<dyn LocalRegistrar>,
    remote: Arc<dyn RemoteDirectory>,
    catalog: Arc<dyn CatalogClient>,
}

/// The directory partition handoff manager
pub struct HandoffManager {
    config: HandoffConfig,
    /// This silo's authoritative partition, shared with the host directory
    local: Arc<Mutex<DirectoryPartition>>,
    state: Mutex<HandoffState>,
    queue: Arc<OperationQueue>,
    ring: Arc<dyn RingView>,
    oracle: Arc<dyn SiloStatusOracle>,
    registrar: Arc<dyn LocalRegistrar>,
    remote: Arc<dyn RemoteDirectory>,
    catalog: Arc<dyn CatalogClient>,
}

impl HandoffManager {
    /// Create a new handoff manager
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: HandoffConfig,
        local: Arc<Mutex<DirectoryPartition>>,
        ring: Arc<dyn RingView>,
        oracle: Arc<dyn SiloStatusOracle>,
        registrar: Arc<dyn LocalRegistrar>,
        remote: Arc<dyn RemoteDirectory>,
        catalog: Arc<dyn CatalogClient>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        debug_assert!(config.validate().is_ok());
        let queue = OperationQueue::new(time, config.retry_delay_ms, config.op_attempts_max);
        Self {
            config,
            local,
            state: Mutex::new(HandoffState {
                mirrored: HashMap::new(),
                followers: Vec::new(),
            }),
            queue,
            ring,
            oracle,
            registrar,
            remote,
            catalog,
        }
    }

    /// Bundle the collaborators a queued operation needs
    fn op_context(&self) -> OpContext {
        OpContext {
            local: Arc::clone(&self.local),
            queue: Arc::clone(&self.queue),
            oracle: Arc::clone(&self.oracle),
            registrar: Arc::clone(&self.registrar),
            remote: Arc::clone(&self.remote),
            catalog: Arc::clone(&self.catalog),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Silos whose partitions we currently mirror
    pub fn mirrored_silos(&self) -> Vec<SiloAddress> {
        let state = self.state.lock().expect("poisoned");
        state.mirrored.keys().cloned().collect()
    }

    /// Snapshot of the copy held for a silo, if any
    pub fn mirrored_snapshot(&self, silo: &SiloAddress) -> Option<HashMap<GrainId, GrainInfo>> {
        let state = self.state.lock().expect("poisoned");
        state.mirrored.get(silo).map(DirectoryPartition::snapshot)
    }

    /// Silos currently mirroring our partition
    pub fn followers(&self) -> Vec<SiloAddress> {
        let state = self.state.lock().expect("poisoned");
        state.followers.clone()
    }

    /// Number of queued operations not yet completed
    pub fn pending_operations(&self) -> usize {
        self.queue.len()
    }

    /// Await all queued operations settled (test and shutdown aid)
    pub async fn quiesce(&self) {
        self.queue.wait_idle().await;
    }

    // =========================================================================
    // Follower management
    // =========================================================================

    /// Record a peer that now mirrors our partition
    pub fn add_follower(&self, follower: SiloAddress) {
        let mut state = self.state.lock().expect("poisoned");
        if !state.followers.contains(&follower) {
            state.followers.push(follower);
        }
    }

    /// Drop every follower; each gets a one-shot unregister RPC
    ///
    /// No retry: the follower set is rebuilt by subsequent membership
    /// events.
    fn reset_followers(&self) {
        let snapshot: Vec<SiloAddress> = {
            let state = self.state.lock().expect("poisoned");
            state.followers.clone()
        };
        for follower in snapshot {
            self.remove_old_follower(follower);
        }
    }

    /// Remove one follower locally and schedule its unregister RPC
    fn remove_old_follower(&self, follower: SiloAddress) {
        {
            let mut state = self.state.lock().expect("poisoned");
            state.followers.retain(|f| f != &follower);
        }
        debug!(silo = %follower, "unregistering follower");

        let remote = Arc::clone(&self.remote);
        let me = self.ring.my_address();
        tokio::spawn(async move {
            if let Err(error) = remote.remove_handoff_partition(&follower, &me).await {
                warn!(silo = %follower, error = %error, "failed to unregister follower");
            }
        });
    }

    // =========================================================================
    // Membership events
    // =========================================================================

    /// A silo left the ring (gracefully or by failure)
    ///
    /// If we hold a copy of its partition, the copy folds into whoever now
    /// owns that range: our own partition if we are the heir, or the copy we
    /// hold for the heir otherwise. Registrations that conflict after the
    /// fold are destroyed as duplicates.
    pub fn process_silo_remove_event(&self, removed: &SiloAddress) {
        info!(silo = %removed, "processing silo removal");
        self.reset_followers();

        let duplicates = {
            let mut state = self.state.lock().expect("poisoned");
            let Some(partition) = state.mirrored.remove(removed) else {
                debug!(silo = %removed, "no partition copy held for removed silo");
                return;
            };

            let predecessors = self.ring.find_predecessors(removed, 1);
            let Some(heir) = predecessors.first().cloned() else {
                warn!(silo = %removed, "removed silo has no predecessor on the ring; dropping its copy");
                return;
            };

            if heir == self.ring.my_address() {
                info!(
                    silo = %removed,
                    grains = partition.len(),
                    "absorbing removed silo's partition"
                );
                let mut local = self.local.lock().expect("poisoned");
                local.merge(partition)
            } else {
                if !state.mirrored.contains_key(&heir) {
                    warn!(
                        silo = %heir,
                        "no copy held for removed silo's predecessor; synthesizing an empty one"
                    );
                }
                info!(
                    silo = %removed,
                    heir = %heir,
                    grains = partition.len(),
                    "folding removed silo's copy into its predecessor's copy"
                );
                state.mirrored.entry(heir).or_default().merge(partition)
            }
        };

        schedule_destroy_duplicates(&self.op_context(), duplicates);
    }

    /// A silo joined the ring
    ///
    /// If it became our immediate successor, the part of our partition whose
    /// ownership moved to it is shipped over (and removed here only after it
    /// acknowledges). If it landed further along among our successors, its
    /// share is carved out of the copy we hold for its predecessor. Copies
    /// for silos that are no longer our successors are dropped.
    pub fn process_silo_add_event(&self, added: &SiloAddress) {
        info!(silo = %added, "processing silo addition");
        self.reset_followers();

        let me = self.ring.my_address();
        let successors = self.ring.find_successors(&me, self.config.successor_count);
        if !successors.contains(added) {
            debug!(silo = %added, "added silo is not among our successors");
            return;
        }

        let mut state = self.state.lock().expect("poisoned");

        if successors.first() == Some(added) {
            // Our new immediate successor takes over part of our partition.
            let addresses = {
                let mut local = self.local.lock().expect("poisoned");
                let moved =
                    local.split(|grain| self.ring.owner_of(grain).as_ref() != Some(&me), false);
                moved.to_list()
            };
            if !addresses.is_empty() {
                info!(
                    silo = %added,
                    grains = addresses.len(),
                    "shipping split partition to new immediate successor"
                );
                let ctx = self.op_context();
                let target = added.clone();
                let action: OpAction = Arc::new(move || {
                    Box::pin(process_added_silo(
                        ctx.clone(),
                        target.clone(),
                        addresses.clone(),
                    ))
                });
                self.queue.enqueue("process_added_silo", action);
            }
        } else {
            // A later successor: carve its share out of the copy we hold for
            // its predecessor.
            let predecessors = self.ring.find_predecessors(added, 1);
            match predecessors.first().cloned() {
                Some(pred) if state.mirrored.contains_key(&pred) => {
                    if let Some(partition) = state.mirrored.get_mut(&pred) {
                        let carved = partition.split(
                            |grain| self.ring.owner_of(grain).as_ref() != Some(&pred),
                            true,
                        );
                        debug!(
                            silo = %added,
                            source = %pred,
                            grains = carved.len(),
                            "carved mirror for added silo out of its predecessor's copy"
                        );
                        state.mirrored.insert(added.clone(), carved);
                    }
                }
                _ => {
                    // A prior event should have established that copy; a
                    // later one will close the gap.
                    warn!(
                        silo = %added,
                        "no copy held for added silo's predecessor; skipping split"
                    );
                }
            }
        }

        // Drop every copy we no longer back up; its owner discovers this
        // independently.
        let stale: Vec<SiloAddress> = state
            .mirrored
            .keys()
            .filter(|silo| !successors.contains(silo))
            .cloned()
            .collect();
        for silo in stale {
            debug!(silo = %silo, "evicting stale partition copy");
            state.mirrored.remove(&silo);
        }
    }

    // =========================================================================
    // Handoff receivers
    // =========================================================================

    /// Accept a copy of a peer's partition, full or delta
    pub fn accept_handoff_partition(
        &self,
        source: &SiloAddress,
        entries: HashMap<GrainId, GrainInfo>,
        is_full_copy: bool,
    ) {
        let mut state = self.state.lock().expect("poisoned");
        if !state.mirrored.contains_key(source) {
            if !is_full_copy {
                warn!(
                    silo = %source,
                    "delta handoff without a prior full copy; synthesizing an empty one"
                );
            }
            state
                .mirrored
                .insert(source.clone(), DirectoryPartition::new());
        }
        let Some(partition) = state.mirrored.get_mut(source) else {
            return;
        };
        if is_full_copy {
            debug!(silo = %source, grains = entries.len(), "accepted full partition copy");
            partition.set(entries);
        } else {
            debug!(silo = %source, grains = entries.len(), "applied partition delta");
            partition.update(entries);
        }
    }

    /// Drop the copy held for a peer; idempotent
    pub fn remove_handoff_partition(&self, source: &SiloAddress) {
        let mut state = self.state.lock().expect("poisoned");
        if state.mirrored.remove(source).is_some() {
            debug!(silo = %source, "dropped partition copy");
        }
    }

    /// Re-register activations that predate a partition move
    ///
    /// The queued body registers every address in parallel; each activation
    /// that lost its race is destroyed on its hosting silo. Failed
    /// registrations stay in the batch so the executor retry resends only
    /// what is unsettled.
    pub fn accept_existing_registrations(&self, addresses: Vec<GrainAddress>) {
        if addresses.is_empty() {
            return;
        }
        debug!(
            count = addresses.len(),
            "queueing re-registration of existing activations"
        );
        let remaining = Arc::new(Mutex::new(addresses));
        let ctx = self.op_context();
        let action: OpAction = Arc::new(move || {
            Box::pin(register_existing(ctx.clone(), Arc::clone(&remaining)))
        });
        self.queue.enqueue("accept_existing_registrations", action);
    }
}

// =============================================================================
// Queued operation bodies
// =============================================================================

/// Ship a split partition to the silo that now owns it
///
/// Entries leave the authoritative partition only after the receiver
/// acknowledged; a failure keeps them in place and the executor retry
/// resends the full list.
async fn process_added_silo(
    ctx: OpContext,
    target: SiloAddress,
    addresses: Vec<GrainAddress>,
) -> DirectoryResult<()> {
    if !ctx.registrar.is_running() {
        debug!("directory no longer running; skipping split handoff");
        return Ok(());
    }

    if !ctx.oracle.silo_status(&target).is_active() {
        // Not recoverable by retrying; a later membership event cleans up.
        warn!(silo = %target, "added silo is not active; skipping split handoff");
        return Ok(());
    }

    ctx.remote
        .accept_split_partition(&target, addresses.clone())
        .await?;

    {
        let mut local = ctx.local.lock().expect("poisoned");
        for address in &addresses {
            local.remove(&address.grain);
        }
    }
    info!(silo = %target, grains = addresses.len(), "split partition handed off");
    Ok(())
}

/// Re-register a batch of activations and reconcile the losers
async fn register_existing(
    ctx: OpContext,
    remaining: Arc<Mutex<Vec<GrainAddress>>>,
) -> DirectoryResult<()> {
    if !ctx.registrar.is_running() {
        debug!("directory no longer running; skipping re-registration");
        return Ok(());
    }

    let batch: Vec<GrainAddress> = remaining.lock().expect("poisoned").clone();
    if batch.is_empty() {
        return Ok(());
    }

    let registrations = batch
        .iter()
        .map(|address| ctx.registrar.register_single_activation(address.clone()));
    let results = join_all(registrations).await;

    let mut duplicates = DuplicateActivations::new();
    let mut failure: Option<DirectoryError> = None;
    {
        let mut remaining = remaining.lock().expect("poisoned");
        for (address, result) in batch.into_iter().zip(results) {
            match result {
                Ok(winner) => {
                    if winner != address {
                        // The original activation lost the race; destroy it
                        // and shrink the retry set.
                        remaining.retain(|a| a != &address);
                        duplicates
                            .entry(address.silo.clone())
                            .or_default()
                            .push(address);
                    }
                }
                Err(error) => {
                    warn!(
                        grain = %address.grain,
                        error = %error,
                        "re-registration failed; leaving for retry"
                    );
                    failure = Some(error);
                }
            }
        }
    }

    schedule_destroy_duplicates(&ctx, duplicates);

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Queue destruction of activations that lost a registration race
fn schedule_destroy_duplicates(ctx: &OpContext, duplicates: DuplicateActivations) {
    if duplicates.is_empty() {
        return;
    }
    let total: usize = duplicates.values().map(Vec::len).sum();
    info!(
        activations = total,
        silos = duplicates.len(),
        "scheduling destruction of duplicate activations"
    );
    let remaining = Arc::new(Mutex::new(duplicates));
    let op_ctx = ctx.clone();
    let action: OpAction = Arc::new(move || {
        Box::pin(delete_duplicates(op_ctx.clone(), Arc::clone(&remaining)))
    });
    ctx.queue.enqueue("destroy_duplicate_activations", action);
}

/// Destroy duplicate activations on their hosting silos
///
/// An entry leaves the working map after a successful deletion RPC or an
/// inactive-target skip; a failed RPC leaves it in place so the executor
/// retry resumes with the remainder.
async fn delete_duplicates(
    ctx: OpContext,
    remaining: Arc<Mutex<DuplicateActivations>>,
) -> DirectoryResult<()> {
    if !ctx.registrar.is_running() {
        return Ok(());
    }

    loop {
        let next = {
            let map = remaining.lock().expect("poisoned");
            map.iter().next().map(|(s, a)| (s.clone(), a.clone()))
        };
        let Some((silo, addresses)) = next else {
            break;
        };

        if ctx.oracle.silo_status(&silo).is_active() {
            ctx.catalog
                .delete_activations(
                    &silo,
                    addresses,
                    DeactivationReason::DuplicateActivation,
                    "This grain has been activated elsewhere",
                )
                .await?;
            debug!(silo = %silo, "destroyed duplicate activations");
        } else {
            debug!(silo = %silo, "silo not active; skipping duplicate destruction");
        }

        remaining.lock().expect("poisoned").remove(&silo);
    }
    Ok(())
}
