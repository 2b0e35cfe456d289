// Bounded queues hold a fast producer back until consumers make room.

mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use target_watch::pipeline::{RunStats, Signal, StageQueue};
use target_watch::source::ValueSource;
use target_watch::{Direction, Pipeline, PipelineConfig, SourceError, Target};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

#[tokio::test]
async fn test_second_push_waits_for_consumer() {
    let q = Arc::new(StageQueue::new("fetch", 1, Signal::new("load"), Signal::new("evaluate")));
    q.push(target("A", Direction::Up, 10, None)).await;

    let pushed = Arc::new(AtomicUsize::new(0));
    let producer = {
        let q = q.clone();
        let pushed = pushed.clone();
        tokio::spawn(async move {
            q.push(target("B", Direction::Up, 10, None)).await;
            pushed.fetch_add(1, Ordering::SeqCst);
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pushed.load(Ordering::SeqCst), 0, "push into a full queue must block");

    let first = q.recv_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.symbol, "A");

    tokio::time::timeout(Duration::from_secs(1), producer).await.unwrap().unwrap();
    assert_eq!(pushed.load(Ordering::SeqCst), 1);
    assert_eq!(q.try_recv().await.unwrap().symbol, "B");
}

/// Each fetch waits for a permit handed out by the test.
struct GatedSource {
    gate: Semaphore,
    fetched: AtomicUsize,
}

#[async_trait]
impl ValueSource for GatedSource {
    async fn fetch(&self, _target: &Target) -> Result<Decimal, SourceError> {
        let permit = self.gate.acquire().await.map_err(|e| SourceError::Unavailable(e.to_string()))?;
        permit.forget();
        self.fetched.fetch_add(1, Ordering::SeqCst);
        Ok(Decimal::from(50))
    }
}

#[tokio::test]
async fn test_load_is_throttled_by_slow_evaluation() {
    let targets: Vec<Target> = (0..6)
        .map(|i| target(&format!("S{}", i), Direction::Up, 100, Some(80)))
        .collect();
    let store = arc(RecordingStore::new(targets));
    let source = arc(GatedSource {
        gate: Semaphore::new(0),
        fetched: AtomicUsize::new(0),
    });
    let config = PipelineConfig {
        evaluate_workers: 1,
        queue_capacity: 1,
        poll_interval: Duration::from_millis(5),
        ..PipelineConfig::default()
    };

    let stats = Arc::new(RunStats::default());
    let pipeline = Pipeline::new(store.clone(), source.clone(), arc(RecordingNotifier::new()), config).unwrap();
    let run = {
        let stats = stats.clone();
        tokio::spawn(async move { pipeline.run_with_stats(stats).await })
    };

    // with the only evaluator stuck on its first item and one queue slot,
    // load gets at most two targets out: one held by the evaluator, one
    // sitting in the queue. The third push waits.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let loaded = stats.loaded.load(Ordering::SeqCst);
    assert!((1..=2).contains(&loaded), "load pushed {} targets past a full queue", loaded);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(stats.loaded.load(Ordering::SeqCst) <= 2, "load kept pushing while stalled");
    assert_eq!(source.fetched.load(Ordering::SeqCst), 0);
    assert!(store.upserts().is_empty());
    assert!(!run.is_finished());

    source.gate.add_permits(6);
    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.loaded, 6);
    assert_eq!(source.fetched.load(Ordering::SeqCst), 6);
    assert_eq!(store.upserts().len(), 6);
}
