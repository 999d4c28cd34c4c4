//! Offload trait for background task execution.
//!
//! This module provides the [`Offload`] trait which abstracts over the worker
//! pool used to run background refreshes. The cache never owns the pool: it is
//! handed one at construction and only ever submits work to it.

use std::future::Future;

use smol_str::SmolStr;

/// Trait for spawning background tasks.
///
/// `TimedCache` uses it to run source reloads without blocking readers. No
/// result is awaited by the submitter; the spawned future publishes its own
/// outcome.
///
/// # Clone bound
///
/// Implementors should use `Arc` internally to ensure all cloned instances
/// share the same configuration and state.
///
/// # Example
///
/// ```ignore
/// use stalebox_core::Offload;
///
/// fn offload_reload<O: Offload>(offload: &O) {
///     offload.spawn("refresh", async move {
///         // Reload the cached value
///     });
/// }
/// ```
pub trait Offload: Send + Sync + Clone + 'static {
    /// Spawn a future to be executed in the background.
    ///
    /// * `kind` - A label categorizing the task type (e.g., "refresh").
    ///   Used for metrics and tracing.
    /// * `future` - The future to execute in the background. Must be `Send + 'static`
    ///   as it may be executed on a different thread.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Fire-and-forget spawning onto a specific runtime.
impl Offload for tokio::runtime::Handle {
    fn spawn<F>(&self, _kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(tokio::runtime::Handle::spawn(self, future));
    }
}
