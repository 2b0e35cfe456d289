//! Load → Evaluate → Persist / Notify.
//!
//! ```text
//!   Load (1) ──fetch──▶ Evaluate (N) ──persist──▶ Persist (N)
//!                                    └─notify───▶ Notify (N)
//! ```
//!
//! Every arrow is a bounded [`StageQueue`]. A stage never sees an
//! end-of-stream item; instead each queue carries its upstream's done
//! signal, and each stage sets its own done signal through a
//! [`StageBarrier`] once all of its workers have drained their input.
//! Persist and Notify both hang off Evaluate's done signal.

pub mod queue;
pub mod signal;
pub mod stages;
pub mod stats;

pub use queue::StageQueue;
pub use signal::{Signal, StageBarrier};
pub use stats::{RunStats, RunSummary};

use crate::error::{PipelineError, StoreError};
use crate::notify::Notifier;
use crate::source::ValueSource;
use crate::store::TargetStore;
use crate::target::Target;
use futures_util::future::join_all;
use stages::{run_worker, Evaluate, Notify, Persist, StageHandler};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub evaluate_workers: usize,
    pub persist_workers: usize,
    pub notify_workers: usize,
    pub queue_capacity: usize,
    /// Bounded wait used while a stage's upstream is still producing.
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            evaluate_workers: 3,
            persist_workers: 3,
            notify_workers: 3,
            queue_capacity: 3,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let counts = [
            ("evaluate_workers", self.evaluate_workers),
            ("persist_workers", self.persist_workers),
            ("notify_workers", self.notify_workers),
            ("queue_capacity", self.queue_capacity),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(PipelineError::InvalidConfig(format!("{} must be >= 1", field)));
            }
        }
        if self.poll_interval.is_zero() {
            return Err(PipelineError::InvalidConfig("poll_interval must be > 0".to_string()));
        }
        Ok(())
    }
}

pub struct Pipeline {
    store: Arc<dyn TargetStore>,
    source: Arc<dyn ValueSource>,
    notifier: Arc<dyn Notifier>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn TargetStore>,
        source: Arc<dyn ValueSource>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            store,
            source,
            notifier,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes the snapshot returned by one `load_active` call and
    /// returns once every stage has finished. Per-item failures are logged
    /// and counted; only a failed load is returned as an error.
    /// Collaborators are closed before returning either way.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_with_stats(Arc::new(RunStats::default())).await
    }

    /// `run` with caller-owned counters, readable while the run is in flight.
    pub async fn run_with_stats(&self, stats: Arc<RunStats>) -> Result<RunSummary, PipelineError> {
        let cfg = &self.config;

        let load_done = Signal::new("load");
        let evaluate_done = Signal::new("evaluate");
        let persist_done = Signal::new("persist");
        let notify_done = Signal::new("notify");

        let fetch_q = Arc::new(StageQueue::new(
            "fetch",
            cfg.queue_capacity,
            load_done.clone(),
            evaluate_done.clone(),
        ));
        let persist_q = Arc::new(StageQueue::new(
            "persist",
            cfg.queue_capacity,
            evaluate_done.clone(),
            persist_done.clone(),
        ));
        let notify_q = Arc::new(StageQueue::new(
            "notify",
            cfg.queue_capacity,
            evaluate_done.clone(),
            notify_done.clone(),
        ));

        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        let evaluate = Arc::new(Evaluate {
            source: self.source.clone(),
            persist: persist_q.clone(),
            notify: notify_q.clone(),
            stats: stats.clone(),
        });
        spawn_stage(&mut workers, cfg.evaluate_workers, &fetch_q, evaluate, cfg.poll_interval);

        let persist = Arc::new(Persist {
            store: self.store.clone(),
            stats: stats.clone(),
        });
        spawn_stage(&mut workers, cfg.persist_workers, &persist_q, persist, cfg.poll_interval);

        let notify = Arc::new(Notify {
            notifier: self.notifier.clone(),
            stats: stats.clone(),
        });
        spawn_stage(&mut workers, cfg.notify_workers, &notify_q, notify, cfg.poll_interval);

        let load_barrier = StageBarrier::new(1, load_done.clone());
        let load = tokio::spawn(load_stage(
            self.store.clone(),
            fetch_q.clone(),
            load_barrier,
            stats.clone(),
        ));

        tracing::debug!(
            evaluate = cfg.evaluate_workers,
            persist = cfg.persist_workers,
            notify = cfg.notify_workers,
            capacity = cfg.queue_capacity,
            "pipeline started"
        );

        let load_result = match load.await {
            Ok(r) => r,
            Err(e) => Err(StoreError::Unavailable(format!("load task aborted: {}", e))),
        };

        for joined in join_all(workers).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "stage worker aborted");
            }
        }

        for done in [&load_done, &evaluate_done, &persist_done, &notify_done] {
            done.wait().await;
        }

        self.close_collaborators().await;

        let summary = stats.summary();
        match load_result {
            Ok(()) => {
                tracing::info!(%summary, "pipeline run complete");
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "pipeline run failed at load");
                Err(PipelineError::Load(e))
            }
        }
    }

    async fn close_collaborators(&self) {
        if let Err(e) = self.store.close().await {
            tracing::warn!(error = %e, "closing target store failed");
        }
        if let Err(e) = self.source.close().await {
            tracing::warn!(error = %e, "closing value source failed");
        }
        if let Err(e) = self.notifier.close().await {
            tracing::warn!(error = %e, "closing notifier failed");
        }
    }
}

fn spawn_stage(
    workers: &mut Vec<JoinHandle<()>>,
    count: usize,
    input: &Arc<StageQueue<Target>>,
    handler: Arc<dyn StageHandler>,
    poll: Duration,
) {
    let barrier = StageBarrier::new(count, input.stage_done().clone());
    for id in 0..count {
        workers.push(tokio::spawn(run_worker(
            id,
            input.clone(),
            barrier.clone(),
            handler.clone(),
            poll,
        )));
    }
}

/// Single producer: one `load_active` call, every target pushed in store
/// order, then the fetch queue's upstream is marked done. The barrier guard
/// marks it done on failure too, so downstream stages always wind down.
async fn load_stage(
    store: Arc<dyn TargetStore>,
    out: Arc<StageQueue<Target>>,
    barrier: Arc<StageBarrier>,
    stats: Arc<RunStats>,
) -> Result<(), StoreError> {
    let _arrival = barrier.enter();

    let targets = store.load_active().await?;
    tracing::info!(count = targets.len(), "loaded active targets");
    for target in targets {
        out.push(target).await;
        RunStats::bump(&stats.loaded);
    }
    Ok(())
}
