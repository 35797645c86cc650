//! Handoff configuration
//!
//! TigerStyle: Explicit configuration with bounded values.

use selkie_core::constants::{
    HANDOFF_OP_ATTEMPTS_COUNT_MAX, HANDOFF_RETRY_DELAY_MS_DEFAULT, RING_SUCCESSORS_COUNT_DEFAULT,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handoff manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Delay between attempts of a failing queued operation, in milliseconds
    pub retry_delay_ms: u64,
    /// Total attempts a queued operation is given before being dropped
    pub op_attempts_max: u32,
    /// How many ring successors to track mirrors for
    pub successor_count: usize,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: HANDOFF_RETRY_DELAY_MS_DEFAULT,
            op_attempts_max: HANDOFF_OP_ATTEMPTS_COUNT_MAX,
            successor_count: RING_SUCCESSORS_COUNT_DEFAULT,
        }
    }
}

impl HandoffConfig {
    /// Set the retry delay
    pub fn with_retry_delay(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Set the attempt cap
    pub fn with_op_attempts(mut self, attempts: u32) -> Self {
        self.op_attempts_max = attempts;
        self
    }

    /// Set the successor tracking depth
    pub fn with_successor_count(mut self, count: usize) -> Self {
        self.successor_count = count;
        self
    }

    /// Get the retry delay as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.op_attempts_max == 0 {
            return Err("operation attempt cap must be positive".into());
        }
        if self.successor_count == 0 {
            return Err("successor count must be positive".into());
        }
        Ok(())
    }

    /// Create configuration for testing with a short retry delay
    pub fn for_testing() -> Self {
        Self {
            retry_delay_ms: 5,
            op_attempts_max: HANDOFF_OP_ATTEMPTS_COUNT_MAX,
            successor_count: RING_SUCCESSORS_COUNT_DEFAULT,
        }
    }
}
