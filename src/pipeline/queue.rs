//! Bounded hand-off between two stages.

use super::signal::Signal;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Bounded FIFO shared by every producer and consumer of one stage
/// boundary, plus the two signals that describe its lifecycle:
/// `upstream_done` (producers pushed their last item) and `stage_done`
/// (every consumer saw `upstream_done` and found the queue empty).
///
/// Items move by value; whoever receives one owns it.
pub struct StageQueue<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
    upstream_done: Signal,
    stage_done: Signal,
}

impl<T: Send> StageQueue<T> {
    pub fn new(name: &'static str, capacity: usize, upstream_done: Signal, stage_done: Signal) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            name,
            tx,
            rx: Mutex::new(rx),
            upstream_done,
            stage_done,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn upstream_done(&self) -> &Signal {
        &self.upstream_done
    }

    pub fn stage_done(&self) -> &Signal {
        &self.stage_done
    }

    /// Waits for room, then enqueues. This is where a fast producer is held
    /// back by slow consumers.
    pub async fn push(&self, item: T) {
        // Both halves live in `self`, so the channel is never closed while
        // a push is possible.
        if self.tx.send(item).await.is_err() {
            tracing::error!(queue = self.name, "push on closed queue dropped an item");
        }
    }

    /// Receives one item, giving up after `wait`. `None` means nothing
    /// arrived in time, not that the queue is finished.
    pub async fn recv_timeout(&self, wait: Duration) -> Option<T> {
        tokio::time::timeout(wait, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten()
    }

    /// Takes an item only if one is already queued.
    pub async fn try_recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        rx.try_recv().ok()
    }

    /// Items currently buffered.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
