//! Tracked task spawning on the ambient tokio runtime.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use smol_str::SmolStr;
use stalebox_core::Offload;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};

#[cfg(feature = "metrics")]
use crate::metrics::{
    OFFLOAD_TASK_DURATION, OFFLOAD_TASKS_ACTIVE, OFFLOAD_TASKS_COMPLETED, OFFLOAD_TASKS_SPAWNED,
};

/// Identifies one task submitted to an [`OffloadManager`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    /// Label the task was submitted with, such as `"refresh"`.
    pub kind: SmolStr,
    /// Sequence number, unique per manager.
    pub id: u64,
}

/// A tracked task.
#[derive(Debug)]
pub struct OffloadHandle {
    handle: JoinHandle<()>,
}

impl OffloadHandle {
    /// Whether the task has run to completion or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task at its next await point.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, OffloadHandle>,
    key_counter: AtomicU64,
}

/// Removes a task from the table when its future completes or is dropped.
///
/// Moved into the task before it is spawned, so cancellation before the first
/// poll still untracks it.
struct Untrack {
    inner: Arc<OffloadManagerInner>,
    key: OffloadKey,
}

impl Drop for Untrack {
    fn drop(&mut self) {
        self.inner.tasks.remove(&self.key);
        #[cfg(feature = "metrics")]
        metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => self.key.kind.to_string())
            .decrement(1.0);
    }
}

/// Default worker pool for background refreshes.
///
/// Spawns each task onto the ambient tokio runtime and keeps its handle until
/// it finishes, so the owning application can wait for or cancel outstanding
/// work at shutdown. The pool is unbounded; every submitted task starts
/// immediately.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Creates an empty pool using `config`.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                key_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an empty pool that never warns about slow tasks.
    pub fn with_defaults() -> Self {
        Self::new(OffloadConfig::default())
    }

    fn next_key(&self, kind: impl Into<SmolStr>) -> OffloadKey {
        let id = self.inner.key_counter.fetch_add(1, Ordering::Relaxed);
        OffloadKey {
            kind: kind.into(),
            id,
        }
    }

    /// Runs `task` in the background and returns the key it is tracked under.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime. Through the [`Offload`] trait the task
    /// is dropped with a warning instead.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = self.next_key(kind);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => key.kind.to_string())
                .increment(1);
            metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => key.kind.to_string()).increment(1.0);
        }

        // The task body waits until its handle is in the table, otherwise a
        // fast task could untrack itself before it was tracked.
        let (registered_tx, registered_rx) = oneshot::channel();
        let handle = self.spawn_inner(task, key.clone(), registered_rx);
        self.inner.tasks.insert(key.clone(), handle);
        let _ = registered_tx.send(());

        key
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.iter().filter(|e| !e.is_finished()).count()
    }

    /// Number of task handles currently held, finished or not.
    pub fn tracked_task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Drops handles of tasks that have already finished.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Aborts every tracked task.
    ///
    /// Intended for application shutdown. A cancelled refresh leaves the
    /// cached value untouched.
    pub fn cancel_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.abort();
        }
    }

    /// Whether the task submitted under `key` is still running.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Resolves once every tracked task has finished.
    pub async fn wait_all(&self) {
        loop {
            self.cleanup_finished();

            if self.inner.tasks.is_empty() {
                break;
            }

            tokio::task::yield_now().await;
        }
    }

    /// Like [`wait_all`](Self::wait_all), giving up after `timeout`.
    ///
    /// Returns `false` if tasks were still running when the timeout expired.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(
        &self,
        task: F,
        key: OffloadKey,
        registered: oneshot::Receiver<()>,
    ) -> OffloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let warn_after = match self.inner.config.timeout_policy {
            TimeoutPolicy::Warn(threshold) => Some(threshold),
            TimeoutPolicy::None => None,
        };
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);
        let guard = Untrack {
            inner: Arc::clone(&self.inner),
            key,
        };

        let handle = tokio::spawn(
            async move {
                let untrack = guard;
                let _ = registered.await;

                let start = Instant::now();
                task.await;
                let elapsed = start.elapsed();
                if let Some(threshold) = warn_after.filter(|threshold| elapsed > *threshold) {
                    warn!(
                        kind = %untrack.key.kind,
                        elapsed_ms = elapsed.as_millis(),
                        threshold_ms = threshold.as_millis(),
                        "offload task ran past its warning threshold"
                    );
                }
                #[cfg(feature = "metrics")]
                Self::record_completion(elapsed, &untrack.key.kind);
            }
            .instrument(span),
        );

        OffloadHandle { handle }
    }

    #[cfg(feature = "metrics")]
    fn record_completion(elapsed: Duration, kind: &SmolStr) {
        metrics::counter!(*OFFLOAD_TASKS_COMPLETED, "kind" => kind.to_string()).increment(1);
        metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_string())
            .record(elapsed.as_secs_f64());
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Offload for OffloadManager {
    /// Submits `future` when called inside a tokio runtime.
    ///
    /// Outside one the future is dropped unpolled and a warning is logged. A
    /// dropped refresh releases its claim, so the cache keeps serving the
    /// previous value.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            let kind = kind.into();
            warn!(%kind, "no tokio runtime to run offload task, dropping it");
            return;
        }
        OffloadManager::spawn(self, kind, future);
    }
}
