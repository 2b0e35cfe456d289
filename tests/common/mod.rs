// Shared fakes for the pipeline integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use target_watch::notify::Notifier;
use target_watch::source::ValueSource;
use target_watch::store::{MemoryTargetStore, TargetStore};
use target_watch::{Direction, NotifyError, PipelineConfig, SourceError, StoreError, Target};

pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_millis(10),
        ..PipelineConfig::default()
    }
}

pub fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

pub fn target(symbol: &str, direction: Direction, target: i64, last_saved: Option<i64>) -> Target {
    let t = Target::new(symbol, symbol.to_lowercase(), d(target), direction).unwrap();
    match last_saved {
        Some(ls) => t.with_last_saved(d(ls)).unwrap(),
        None => t,
    }
}

#[derive(Debug, Clone)]
pub enum Quote {
    Value(Decimal),
    RateLimited,
    Down,
    Garbage,
}

/// Answers per source key; unknown keys are reported unavailable.
#[derive(Default)]
pub struct ScriptedSource {
    quotes: Mutex<HashMap<String, Quote>>,
    pub calls: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quote(self, key: &str, quote: Quote) -> Self {
        self.quotes.lock().unwrap().insert(key.to_string(), quote);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ValueSource for ScriptedSource {
    async fn fetch(&self, target: &Target) -> Result<Decimal, SourceError> {
        self.calls.lock().unwrap().push(target.source_key.clone());
        let quote = self.quotes.lock().unwrap().get(&target.source_key).cloned();
        match quote {
            Some(Quote::Value(v)) => Ok(v),
            Some(Quote::RateLimited) => Err(SourceError::RateLimited(target.source_key.clone())),
            Some(Quote::Garbage) => Err(SourceError::Parse {
                key: target.source_key.clone(),
                reason: "garbage".to_string(),
            }),
            Some(Quote::Down) | None => Err(SourceError::Unavailable("connection refused".to_string())),
        }
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Memory store that records every upsert and can be told to fail.
pub struct RecordingStore {
    pub inner: MemoryTargetStore,
    pub upserts: Mutex<Vec<Target>>,
    pub fail_load: bool,
    pub fail_upsert_for: Option<String>,
    pub loads: AtomicUsize,
    pub closed: AtomicUsize,
}

impl RecordingStore {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            inner: MemoryTargetStore::with_targets(targets),
            upserts: Mutex::new(Vec::new()),
            fail_load: false,
            fail_upsert_for: None,
            loads: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn upserts(&self) -> Vec<Target> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetStore for RecordingStore {
    async fn load_active(&self) -> Result<Vec<Target>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(StoreError::Unavailable("database is down".to_string()));
        }
        self.inner.load_active().await
    }

    async fn upsert(&self, target: Target) -> Result<Target, StoreError> {
        self.upserts.lock().unwrap().push(target.clone());
        if self.fail_upsert_for.as_deref() == Some(target.symbol.as_str()) {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        self.inner.upsert(target).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Target>>,
    pub fail: bool,
    pub closed: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Target> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, target: &Target) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(target.clone());
        if self.fail {
            return Err(NotifyError::DeliveryFailed("chat not found".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn arc<T>(v: T) -> Arc<T> {
    Arc::new(v)
}
