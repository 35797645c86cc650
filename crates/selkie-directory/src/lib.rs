//! Selkie Directory
//!
//! Grain directory partitions and the partition handoff manager.
//!
//! # Overview
//!
//! A Selkie cluster keeps its grain directory on a consistent hash ring:
//! each grain's entry lives on the silo succeeding the grain's hash, and
//! each silo mirrors the partitions of its ring neighbors for failover.
//! This crate provides:
//!
//! - [`DirectoryPartition`]: the grain-to-registration map with
//!   split/merge/delta semantics
//! - [`RingView`], [`SiloStatusOracle`], [`RemoteDirectory`],
//!   [`CatalogClient`], [`LocalRegistrar`]: the collaborator seams
//! - [`OperationQueue`]: FIFO executor with bounded retry for outbound work
//! - [`HandoffManager`]: the membership-event driver that splits, merges,
//!   and ships partitions, and reconciles duplicate activations
//!
//! # TigerStyle
//! - Event handlers mutate synchronously; only queued operations suspend
//! - Bounded retry, explicit attempt caps
//! - Errors never escape the operation executor
//!
//! # Example
//!
//! ```rust,ignore
//! use selkie_directory::{HandoffConfig, HandoffManager, MemoryRing};
//!
//! let manager = HandoffManager::new(
//!     HandoffConfig::default(),
//!     local_partition,
//!     ring,
//!     oracle,
//!     registrar,
//!     remote,
//!     catalog,
//!     time,
//! );
//!
//! // React to a membership event; outbound work is queued and retried.
//! manager.process_silo_add_event(&new_silo);
//! ```

mod config;
mod error;
mod handoff;
mod oracle;
mod partition;
mod queue;
mod remote;
mod ring;

pub use config::HandoffConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use handoff::{HandoffManager, LocalRegistrar};
pub use oracle::{MemoryStatusOracle, SiloStatusOracle};
pub use partition::{DirectoryPartition, DuplicateActivations, GrainActivation, GrainInfo};
pub use queue::{OpAction, OpFuture, OperationQueue};
pub use remote::{CatalogClient, DeactivationReason, RemoteDirectory};
pub use ring::{ring_hash, MemoryRing, RingView};
