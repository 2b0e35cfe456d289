use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters bumped by workers while a run is in flight.
#[derive(Debug, Default)]
pub struct RunStats {
    pub loaded: AtomicUsize,
    pub evaluated: AtomicUsize,
    pub fetch_failures: AtomicUsize,
    pub rate_limited: AtomicUsize,
    pub triggered: AtomicUsize,
    pub persisted: AtomicUsize,
    pub persist_failures: AtomicUsize,
    pub notified: AtomicUsize,
    pub notify_failures: AtomicUsize,
}

impl RunStats {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RunSummary {
        let get = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        RunSummary {
            loaded: get(&self.loaded),
            evaluated: get(&self.evaluated),
            fetch_failures: get(&self.fetch_failures),
            rate_limited: get(&self.rate_limited),
            triggered: get(&self.triggered),
            persisted: get(&self.persisted),
            persist_failures: get(&self.persist_failures),
            notified: get(&self.notified),
            notify_failures: get(&self.notify_failures),
        }
    }
}

/// What one completed run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: usize,
    pub evaluated: usize,
    pub fetch_failures: usize,
    pub rate_limited: usize,
    pub triggered: usize,
    pub persisted: usize,
    pub persist_failures: usize,
    pub notified: usize,
    pub notify_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded={} evaluated={} triggered={} persisted={} notified={} \
             fetch_failures={} rate_limited={} persist_failures={} notify_failures={}",
            self.loaded,
            self.evaluated,
            self.triggered,
            self.persisted,
            self.notified,
            self.fetch_failures,
            self.rate_limited,
            self.persist_failures,
            self.notify_failures,
        )
    }
}
