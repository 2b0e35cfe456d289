//! One-shot completion signals and the per-stage barrier that sets them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// A flag that goes from unset to set exactly once and is observable by any
/// number of tasks. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct Signal {
    name: &'static str,
    tx: Arc<watch::Sender<bool>>,
}

impl Signal {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            name,
            tx: Arc::new(tx),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Sets the flag. Returns `true` only for the call that flipped it.
    pub fn set(&self) -> bool {
        let flipped = self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
        if flipped {
            tracing::debug!(signal = self.name, "signal set");
        }
        flipped
    }

    /// Resolves once the flag is set (immediately if it already is).
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Counts down the workers of one stage and sets the stage's signal when
/// the last one arrives.
#[derive(Debug)]
pub struct StageBarrier {
    remaining: AtomicUsize,
    done: Signal,
}

impl StageBarrier {
    pub fn new(workers: usize, done: Signal) -> Arc<Self> {
        let barrier = Arc::new(Self {
            remaining: AtomicUsize::new(workers),
            done,
        });
        if workers == 0 {
            barrier.done.set();
        }
        barrier
    }

    /// Marks one worker finished. Returns `true` for the worker that
    /// completed the stage, which is also the one that set the signal.
    pub fn arrive(&self) -> bool {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "more arrivals than workers at {}", self.done.name());
        if prev == 1 {
            self.done.set()
        } else {
            false
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Guard that arrives when dropped, so a worker that panics still
    /// releases the stage.
    pub fn enter(self: &Arc<Self>) -> BarrierGuard {
        BarrierGuard {
            barrier: Arc::clone(self),
        }
    }
}

pub struct BarrierGuard {
    barrier: Arc<StageBarrier>,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}
