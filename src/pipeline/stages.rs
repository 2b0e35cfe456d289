use super::queue::StageQueue;
use super::signal::StageBarrier;
use super::stats::RunStats;
use crate::error::SourceError;
use crate::notify::Notifier;
use crate::source::ValueSource;
use crate::store::TargetStore;
use crate::target::Target;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Per-item work of one stage. Failures are handled inside `process`;
/// nothing but targets crosses a queue.
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, target: Target);
}

/// Drains `input` until its upstream has finished and the queue is empty,
/// then arrives at `barrier`.
///
/// While the upstream is still producing, receives are bounded by `poll`
/// so the worker notices completion promptly. Once the upstream is done,
/// a non-blocking receive that comes back empty ends the worker.
pub async fn run_worker(
    id: usize,
    input: Arc<StageQueue<Target>>,
    barrier: Arc<StageBarrier>,
    handler: Arc<dyn StageHandler>,
    poll: Duration,
) {
    let _arrival = barrier.enter();
    let mut handled = 0usize;

    loop {
        let next = if input.upstream_done().is_set() {
            match input.try_recv().await {
                Some(t) => t,
                None => break,
            }
        } else {
            match input.recv_timeout(poll).await {
                Some(t) => t,
                None => continue,
            }
        };
        handler.process(next).await;
        handled += 1;
    }

    tracing::debug!(stage = handler.name(), worker = id, handled, "worker finished");
}

pub struct Evaluate {
    pub source: Arc<dyn ValueSource>,
    pub persist: Arc<StageQueue<Target>>,
    pub notify: Arc<StageQueue<Target>>,
    pub stats: Arc<RunStats>,
}

#[async_trait]
impl StageHandler for Evaluate {
    fn name(&self) -> &'static str {
        "evaluate"
    }

    async fn process(&self, mut target: Target) {
        RunStats::bump(&self.stats.evaluated);

        match self.source.fetch(&target).await {
            Ok(value) => target.current = Some(value),
            Err(SourceError::RateLimited(key)) => {
                RunStats::bump(&self.stats.rate_limited);
                tracing::info!(symbol = %target.symbol, key = %key, "rate limited, skipping this run");
            }
            Err(e) => {
                RunStats::bump(&self.stats.fetch_failures);
                tracing::warn!(symbol = %target.symbol, error = %e, "fetch failed");
            }
        }

        if target.evaluate() {
            RunStats::bump(&self.stats.triggered);
            tracing::info!(
                id = ?target.id,
                symbol = %target.symbol,
                target = %target.target,
                current = ?target.current,
                "target triggered"
            );
            self.notify.push(target.clone()).await;
        } else {
            tracing::debug!(symbol = %target.symbol, current = ?target.current, "not triggered");
        }

        self.persist.push(target).await;
    }
}

pub struct Persist {
    pub store: Arc<dyn TargetStore>,
    pub stats: Arc<RunStats>,
}

#[async_trait]
impl StageHandler for Persist {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn process(&self, mut target: Target) {
        target.advance_baseline();
        let symbol = target.symbol.clone();
        match self.store.upsert(target).await {
            Ok(saved) => {
                RunStats::bump(&self.stats.persisted);
                tracing::debug!(id = ?saved.id, symbol = %saved.symbol, active = saved.active, "persisted");
            }
            Err(e) => {
                RunStats::bump(&self.stats.persist_failures);
                tracing::warn!(symbol = %symbol, error = %e, "persist failed, update lost for this run");
            }
        }
    }
}

pub struct Notify {
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<RunStats>,
}

#[async_trait]
impl StageHandler for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn process(&self, target: Target) {
        match self.notifier.send(&target).await {
            Ok(()) => {
                RunStats::bump(&self.stats.notified);
            }
            Err(e) => {
                RunStats::bump(&self.stats.notify_failures);
                tracing::warn!(symbol = %target.symbol, error = %e, "notification not delivered");
            }
        }
    }
}
