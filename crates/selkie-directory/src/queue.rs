//! Operation queue and single-consumer executor
//!
//! TigerStyle: FIFO dispatch, bounded retry, no escaping errors.
//!
//! Membership event handlers mutate state synchronously and push any network
//! side effect here as a named operation. One consumer task drains the queue
//! in order; a failing operation is retried in place with a fixed delay up
//! to the attempt cap, then dropped with a warning. Nothing an operation
//! does can fail the event handler that queued it.

use crate::error::DirectoryResult;
use selkie_core::constants::HANDOFF_QUEUE_DEPTH_MAX;
use selkie_core::TimeProvider;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Future returned by one attempt of a queued operation
pub type OpFuture = Pin<Box<dyn Future<Output = DirectoryResult<()>> + Send>>;

/// Factory producing a fresh future per attempt
///
/// Retry re-invokes the factory, so state an operation wants to carry across
/// attempts (a shrinking work list, say) lives in what the closure captures.
pub type OpAction = Arc<dyn Fn() -> OpFuture + Send + Sync>;

struct PendingOp {
    name: &'static str,
    action: OpAction,
}

struct QueueState {
    pending: VecDeque<PendingOp>,
    /// Attempts made on the operation currently at the head.
    /// Persists across retries of the same head, resets when the head leaves.
    head_attempts: u32,
}

/// FIFO of named async operations with a bounded-retry executor
pub struct OperationQueue {
    state: Mutex<QueueState>,
    /// Admits one consumer; duplicate consumer submissions park here and
    /// find the queue already drained.
    consumer: tokio::sync::Mutex<()>,
    time: Arc<dyn TimeProvider>,
    retry_delay_ms: u64,
    attempts_max: u32,
}

impl OperationQueue {
    /// Create a new queue
    pub fn new(time: Arc<dyn TimeProvider>, retry_delay_ms: u64, attempts_max: u32) -> Arc<Self> {
        debug_assert!(attempts_max >= 1);
        Arc::new(Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                head_attempts: 0,
            }),
            consumer: tokio::sync::Mutex::new(()),
            time,
            retry_delay_ms,
            attempts_max,
        })
    }

    /// Number of operations waiting (including the one being attempted)
    pub fn len(&self) -> usize {
        self.state.lock().expect("poisoned").pending.len()
    }

    /// Whether no operations are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push an operation and make sure a consumer is running
    pub fn enqueue(self: &Arc<Self>, name: &'static str, action: OpAction) {
        let depth = {
            let mut state = self.state.lock().expect("poisoned");
            if state.pending.len() >= HANDOFF_QUEUE_DEPTH_MAX {
                warn!(op = name, depth = state.pending.len(), "handoff queue full; dropping operation");
                return;
            }
            state.pending.push_back(PendingOp { name, action });
            state.pending.len()
        };

        // A deeper queue means a consumer is already looping; it will reach
        // the new operation on its own.
        if depth <= 2 {
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                queue.execute_pending().await;
            });
        }
    }

    /// Await the queue drained and the consumer parked
    pub async fn wait_idle(&self) {
        loop {
            {
                let _consumer = self.consumer.lock().await;
                let state = self.state.lock().expect("poisoned");
                if state.pending.is_empty() {
                    return;
                }
            }
            tokio::task::yield_now().await;
        }
    }

    /// Drain the queue; at most one instance runs at a time
    async fn execute_pending(self: Arc<Self>) {
        let _consumer = self.consumer.lock().await;

        loop {
            let (name, action, attempt) = {
                let mut state = self.state.lock().expect("poisoned");
                let Some(op) = state.pending.front() else {
                    break;
                };
                let name = op.name;
                let action = Arc::clone(&op.action);
                state.head_attempts += 1;
                (name, action, state.head_attempts)
            };

            let result = (*action)().await;

            let mut retry = false;
            {
                let mut state = self.state.lock().expect("poisoned");
                match result {
                    Ok(()) => {
                        state.head_attempts = 0;
                        state.pending.pop_front();
                        debug!(op = name, attempt, "handoff operation completed");
                    }
                    Err(error) if state.head_attempts < self.attempts_max => {
                        warn!(
                            op = name,
                            attempt,
                            error = %error,
                            "handoff operation failed; will be retried"
                        );
                        retry = true;
                    }
                    Err(error) => {
                        warn!(
                            op = name,
                            attempt,
                            error = %error,
                            "handoff operation failed; will NOT be retried"
                        );
                        state.head_attempts = 0;
                        state.pending.pop_front();
                    }
                }
            }

            if retry {
                self.time.sleep_ms(self.retry_delay_ms).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectoryError;
    use selkie_core::MockClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_queue(clock: Arc<MockClock>) -> Arc<OperationQueue> {
        OperationQueue::new(clock, 250, 2)
    }

    #[tokio::test]
    async fn test_op_runs_once_on_success() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(clock);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        queue.enqueue(
            "noop",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );

        queue.wait_idle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_order_never_interleaved() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(clock);
        let events = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5u32 {
            let events = Arc::clone(&events);
            queue.enqueue(
                "ordered",
                Arc::new(move || {
                    let events = Arc::clone(&events);
                    Box::pin(async move {
                        events.lock().expect("poisoned").push(("start", n));
                        tokio::task::yield_now().await;
                        events.lock().expect("poisoned").push(("end", n));
                        Ok(())
                    })
                }),
            );
        }

        queue.wait_idle().await;

        let events = events.lock().expect("poisoned").clone();
        assert_eq!(events.len(), 10);
        // Completion of op i happens before start of op i+1.
        for n in 0..5u32 {
            assert_eq!(events[2 * n as usize], ("start", n));
            assert_eq!(events[2 * n as usize + 1], ("end", n));
        }
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(Arc::clone(&clock));
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        queue.enqueue(
            "flaky",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(DirectoryError::internal("first attempt fails"))
                    } else {
                        Ok(())
                    }
                })
            }),
        );

        queue.wait_idle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        // The retry waited out the configured delay.
        assert!(clock.now_ms() >= 250);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_retry_exhausted_drops_op() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(clock);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        queue.enqueue(
            "doomed",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DirectoryError::internal("always fails"))
                })
            }),
        );

        queue.wait_idle().await;
        // Two total attempts, then dropped.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failing_head_blocks_but_does_not_starve_successor() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(clock);
        let first_attempts = Arc::new(AtomicU32::new(0));
        let second_ran = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&first_attempts);
        let observer = Arc::clone(&second_ran);
        queue.enqueue(
            "doomed",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                let observer = Arc::clone(&observer);
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // The head retries in place; the successor must not have
                    // started yet.
                    assert_eq!(observer.load(Ordering::SeqCst), 0);
                    Err(DirectoryError::internal("always fails"))
                })
            }),
        );

        let observer = Arc::clone(&second_ran);
        queue.enqueue(
            "after",
            Arc::new(move || {
                let observer = Arc::clone(&observer);
                Box::pin(async move {
                    observer.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );

        queue.wait_idle().await;
        assert_eq!(first_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_counter_resets_between_ops() {
        let clock = Arc::new(MockClock::new(0));
        let queue = test_queue(clock);

        // First op fails once, succeeds on its second attempt.
        let first = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&first);
        queue.enqueue(
            "flaky-1",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(DirectoryError::internal("first attempt fails"))
                    } else {
                        Ok(())
                    }
                })
            }),
        );

        // Second op must get a fresh attempt budget.
        let second = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&second);
        queue.enqueue(
            "flaky-2",
            Arc::new(move || {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(DirectoryError::internal("first attempt fails"))
                    } else {
                        Ok(())
                    }
                })
            }),
        );

        queue.wait_idle().await;
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }
}
