//! Background reloads of a stale value.
//!
//! A refresh is claimed by the reader that first observes staleness (see
//! `CacheEntry::lookup`) and then runs on the cache's [`Offload`] pool. The
//! claim is released by an [`InFlightGuard`] whatever happens to the task:
//! commit, source failure, panic, or cancellation by the pool owner.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use stalebox_core::{Clock, Offload, Source};
use tracing::{Instrument, debug, debug_span, warn};

use crate::cache::Shared;
use crate::error::CacheError;
use crate::metrics;

/// Runs the source once, turning panics into [`CacheError::Panic`].
pub(crate) async fn load<S>(source: &S) -> Result<S::Value, CacheError>
where
    S: Source,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    match AssertUnwindSafe(async { source.load().await })
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(CacheError::computation(error)),
        Err(payload) => Err(CacheError::from_panic(payload)),
    }
}

/// Holds the in-flight claim of one refresh.
struct InFlightGuard<S: Source, C> {
    shared: Arc<Shared<S, C>>,
    released: bool,
}

impl<S: Source, C: Clock> InFlightGuard<S, C> {
    fn new(shared: Arc<Shared<S, C>>) -> Self {
        Self {
            shared,
            released: false,
        }
    }

    /// Publishes `value` and releases the claim under one lock.
    fn commit(mut self, value: S::Value) {
        let mut entry = self.shared.entry.lock();
        entry.store(value, self.shared.clock.now());
        entry.finish_refresh();
        self.released = true;
    }
}

impl<S: Source, C> Drop for InFlightGuard<S, C> {
    fn drop(&mut self) {
        if !self.released {
            self.shared.entry.lock().finish_refresh();
        }
    }
}

/// Submits a reload of `shared`'s value to `offload`.
///
/// The caller must have claimed the refresh; the claim is released when the
/// submitted task ends or is dropped unpolled.
pub(crate) fn spawn<S, C, O>(shared: &Arc<Shared<S, C>>, offload: &O)
where
    S: Source,
    S::Value: Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    C: Clock,
    O: Offload,
{
    let guard = InFlightGuard::new(Arc::clone(shared));
    metrics::record_refresh_spawned();

    offload.spawn(
        "refresh",
        async move {
            let start = Instant::now();
            let result = load(&guard.shared.source).await;
            metrics::record_refresh_outcome(result.is_ok(), start.elapsed());
            match result {
                Ok(value) => {
                    guard.commit(value);
                    debug!(elapsed_ms = start.elapsed().as_millis(), "refreshed value committed");
                }
                Err(error) => {
                    warn!(%error, "background refresh failed, serving previous value");
                }
            }
        }
        .instrument(debug_span!("refresh")),
    );
}
