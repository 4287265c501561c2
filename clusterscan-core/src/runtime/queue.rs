use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use clusterscan_model::RunObjectKey;

use crate::{config::RetryConfig, reconcile::RunRequeue};

use super::backoff::Backoff;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<RunObjectKey>,
    /// Keys currently in `pending`.
    queued: HashSet<RunObjectKey>,
    /// Keys handed out by `get` and not yet `done`.
    processing: HashSet<RunObjectKey>,
    /// Keys added while processing; re-queued on `done`.
    dirty: HashSet<RunObjectKey>,
    failures: HashMap<RunObjectKey, u32>,
    shut_down: bool,
}

/// Keyed work queue with at most one in-flight handler per key.
///
/// Adding a key that is already pending is a no-op. Adding a key that is
/// being processed defers it until the current handler calls [`done`], so a
/// key is never handed to two workers at once.
///
/// [`done`]: WorkQueue::done
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    backoff: Backoff,
    shutdown: CancellationToken,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("WorkQueue");
        debug.field("backoff", &self.backoff);
        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("pending", &state.pending.len())
                    .field("processing", &state.processing.len())
                    .field("dirty", &state.dirty.len())
                    .field("shut_down", &state.shut_down);
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl WorkQueue {
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            backoff: Backoff::new(retry),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn add(&self, key: RunObjectKey) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        if state.processing.contains(&key) {
            state.dirty.insert(key);
            return;
        }
        if state.queued.insert(key.clone()) {
            state.pending.push_back(key);
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Adds `key` once `delay` has elapsed, unless the queue shuts down first.
    pub fn add_after(self: &Arc<Self>, key: RunObjectKey, delay: Duration) {
        if delay.is_zero() {
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.add(key).await });
            return;
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = queue.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => queue.add(key).await,
            }
        });
    }

    /// Waits for the next key. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<RunObjectKey> {
        loop {
            {
                let mut state = self.state.lock().await;
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.pending.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    // One stored permit covers one waiter; pass it on.
                    if !state.pending.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(key);
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Releases `key` after its handler returns.
    pub async fn done(&self, key: &RunObjectKey) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.remove(key) && !state.shut_down && state.queued.insert(key.clone()) {
            state.pending.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Records a failure for `key` and schedules it after the backoff delay.
    pub async fn requeue_with_backoff(self: &Arc<Self>, key: RunObjectKey) -> Duration {
        let failures = {
            let mut state = self.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_default();
            *failures = failures.saturating_add(1);
            *failures
        };
        let delay = self.backoff.delay(&key, failures);
        trace!(
            target: "clusterscan::runtime",
            run = %key,
            failures,
            delay_ms = delay.as_millis() as u64,
            "scheduling retry"
        );
        self.add_after(key, delay);
        delay
    }

    /// Clears the failure count so the next failure starts from the base delay.
    pub async fn forget(&self, key: &RunObjectKey) {
        self.state.lock().await.failures.remove(key);
    }

    pub async fn failures(&self, key: &RunObjectKey) -> u32 {
        self.state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_processing(&self, key: &RunObjectKey) -> bool {
        self.state.lock().await.processing.contains(key)
    }

    pub async fn shut_down(&self) {
        self.state.lock().await.shut_down = true;
        self.shutdown.cancel();
        self.notify.notify_waiters();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[async_trait]
impl RunRequeue for WorkQueue {
    async fn requeue(&self, key: RunObjectKey) {
        self.add(key).await;
    }
}
