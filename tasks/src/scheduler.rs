//! Async driver that fires queued tasks on the tokio clock.

use crate::TaskQueue;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

enum Command<K, P> {
    Schedule { key: K, delay: Duration, payload: P },
    Cancel { key: K },
}

/// Cloneable handle for scheduling and cancelling tasks by key.
///
/// Commands are applied by the [`Scheduler`] driver; once the driver has
/// stopped (or was dropped) they are silently discarded, which is the
/// behavior shutdown paths want.
pub struct SchedulerHandle<K, P> {
    tx: mpsc::UnboundedSender<Command<K, P>>,
}

impl<K, P> Clone for SchedulerHandle<K, P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<K, P> SchedulerHandle<K, P> {
    /// Schedule `payload` under `key` to fire after `delay`, replacing any
    /// pending entry for the key.
    pub fn schedule(&self, key: K, delay: Duration, payload: P) {
        let _ = self.tx.send(Command::Schedule {
            key,
            delay,
            payload,
        });
    }

    /// Cancel the pending entry for `key`, if any.
    pub fn cancel(&self, key: K) {
        let _ = self.tx.send(Command::Cancel { key });
    }
}

/// Drives a [`TaskQueue`] on the tokio clock, delivering each due
/// `(key, payload)` pair into the channel given at construction.
///
/// The driver stops when every handle is dropped or when the due-task
/// receiver goes away.
pub struct Scheduler<K, P> {
    queue: TaskQueue<K, P>,
    base: Instant,
    rx: mpsc::UnboundedReceiver<Command<K, P>>,
    due_tx: mpsc::Sender<(K, P)>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, P> Scheduler<K, P> {
    pub fn new(due_tx: mpsc::Sender<(K, P)>) -> (Self, SchedulerHandle<K, P>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                queue: TaskQueue::new(),
                base: Instant::now(),
                rx,
                due_tx,
            },
            SchedulerHandle { tx },
        )
    }

    /// Run until all handles are dropped.
    pub async fn run(mut self) {
        loop {
            let next = self.queue.next_fire_at();
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Schedule { key, delay, payload }) => {
                        let fire_at = self.now_ms().saturating_add(delay.as_millis() as u64);
                        trace!(?key, fire_at_ms = fire_at, "task scheduled");
                        self.queue.schedule(key, fire_at, payload);
                    }
                    Some(Command::Cancel { key }) => {
                        trace!(?key, "task cancelled");
                        self.queue.cancel(&key);
                    }
                    None => break,
                },
                _ = Self::sleep_until_ms(self.base, next), if next.is_some() => {
                    let now = self.now_ms();
                    while let Some(due) = self.queue.pop_due(now) {
                        if self.due_tx.send(due).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.base.elapsed().as_millis() as u64
    }

    async fn sleep_until_ms(base: Instant, at_ms: Option<u64>) {
        match at_ms {
            Some(at) => tokio::time::sleep_until(base + Duration::from_millis(at)).await,
            None => std::future::pending().await,
        }
    }
}
