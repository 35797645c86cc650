//! Selkie Core
//!
//! Identity types, limits, and I/O abstractions shared by the Selkie grain
//! directory crates.
//!
//! # Overview
//!
//! - [`GrainId`], [`ActivationId`], [`GrainAddress`]: grain identity
//! - [`SiloAddress`], [`SiloStatus`]: peer silo identity and liveness
//! - [`constants`]: TigerStyle limits
//! - [`io`]: time abstraction for deterministic tests
//!
//! # TigerStyle
//! - Explicit validation on construction
//! - Bounded lengths and counts, asserted at compile time where possible
//! - Errors returned, never panics

pub mod constants;
pub mod error;
pub mod grain;
pub mod io;
pub mod silo;

pub use error::{Error, Result};
pub use grain::{ActivationId, GrainAddress, GrainId};
pub use io::{MockClock, TimeProvider, WallClockTime};
pub use silo::{SiloAddress, SiloStatus};
