//! I/O abstraction layer
//!
//! TigerStyle: All external I/O goes through abstraction traits.
//!
//! Time is the only non-deterministic input this subsystem consumes (the
//! operation executor sleeps between retry attempts). Routing it through
//! `TimeProvider` lets tests drive retries without real waiting.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Time Provider
// =============================================================================

/// Time provider abstraction
///
/// All code that needs current time or sleep MUST use this trait; never call
/// `std::time::SystemTime::now()` or `tokio::time::sleep` directly from
/// business logic.
#[async_trait]
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in milliseconds since epoch
    fn now_ms(&self) -> u64;

    /// Sleep for the specified duration
    ///
    /// In production: actual tokio::time::sleep.
    /// In tests: advances simulated time, returns immediately.
    async fn sleep_ms(&self, ms: u64);
}

/// Production time provider using wall clock
#[derive(Debug, Clone, Default)]
pub struct WallClockTime;

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeProvider for WallClockTime {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }
}

/// Mock clock for testing
///
/// `sleep_ms` advances the simulated time and returns immediately, so retry
/// delays cost nothing in tests while remaining observable via `now_ms`.
#[derive(Debug, Default)]
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    /// Create a new mock clock starting at the given time
    pub fn new(initial_ms: u64) -> Self {
        Self {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    /// Advance time by the given milliseconds
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimeProvider for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }

    async fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
        // Yield so concurrently spawned work gets a chance to run, as a real
        // sleep would allow.
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wall_clock_now() {
        let clock = WallClockTime::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a > 0);
    }

    #[tokio::test]
    async fn test_mock_clock_advance() {
        let clock = MockClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);

        clock.sleep_ms(250).await;
        assert_eq!(clock.now_ms(), 1_500);
    }
}
