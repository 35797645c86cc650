//! TigerStyle constants for Selkie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Identity Limits
// =============================================================================

/// Maximum length of a grain ID in bytes
pub const GRAIN_ID_LENGTH_BYTES_MAX: usize = 256;

/// Maximum length of an activation ID in bytes
pub const ACTIVATION_ID_LENGTH_BYTES_MAX: usize = 64;

/// Maximum length of a silo address in bytes
pub const SILO_ADDRESS_LENGTH_BYTES_MAX: usize = 128;

// =============================================================================
// Handoff Limits
// =============================================================================

/// Total attempts the operation executor gives a queued handoff operation
pub const HANDOFF_OP_ATTEMPTS_COUNT_MAX: u32 = 2;

/// Delay between attempts of a failing handoff operation in milliseconds
pub const HANDOFF_RETRY_DELAY_MS_DEFAULT: u64 = 250;

/// How many ring successors the handoff manager tracks mirrors for
pub const RING_SUCCESSORS_COUNT_DEFAULT: usize = 2;

/// Maximum number of operations the handoff queue will hold
pub const HANDOFF_QUEUE_DEPTH_MAX: usize = 10_000;

// =============================================================================
// Partition Limits
// =============================================================================

/// Maximum number of grains a single directory partition may hold
pub const PARTITION_GRAINS_COUNT_MAX: usize = 10_000_000;

/// Maximum number of activations recorded per grain entry
pub const GRAIN_ACTIVATIONS_COUNT_MAX: usize = 1_000;

// Compile-time assertions for constant validity
const _: () = {
    assert!(HANDOFF_OP_ATTEMPTS_COUNT_MAX >= 1);
    assert!(HANDOFF_RETRY_DELAY_MS_DEFAULT > 0);
    assert!(RING_SUCCESSORS_COUNT_DEFAULT >= 1);
    assert!(GRAIN_ID_LENGTH_BYTES_MAX >= 64);
    assert!(SILO_ADDRESS_LENGTH_BYTES_MAX >= 32);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_have_units_in_names() {
        // This test documents the naming convention:
        // byte limits end in _BYTES_*, time limits in _MS_*, counts in _COUNT_*.
        let _: usize = GRAIN_ID_LENGTH_BYTES_MAX;
        let _: u64 = HANDOFF_RETRY_DELAY_MS_DEFAULT;
        let _: u32 = HANDOFF_OP_ATTEMPTS_COUNT_MAX;
    }
}
