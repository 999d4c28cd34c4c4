//! The stale-while-revalidate cache.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stalebox_core::{CacheStatus, Clock, MonotonicClock, Offload, Source};
use tracing::debug;

use crate::entry::{CacheEntry, Lookup};
use crate::error::CacheError;
use crate::metrics;
use crate::offload::OffloadManager;
use crate::policy::{CachePolicy, ColdStartPolicy};
use crate::refresh;

/// State shared between cache clones and their background refreshes.
pub(crate) struct Shared<S: Source, C> {
    pub(crate) source: S,
    pub(crate) clock: C,
    pub(crate) policy: CachePolicy,
    pub(crate) entry: Mutex<CacheEntry<S::Value>>,
    /// Serializes cold-start computations under [`ColdStartPolicy::SingleFlight`].
    cold_start: tokio::sync::Mutex<()>,
}

/// Single-value cache in front of an expensive [`Source`].
///
/// The first read computes the value in the calling task. After that, reads
/// never wait on the source: a fresh value is returned as is, and a stale one
/// is returned while a single background refresh replaces it. A failed
/// refresh is logged and the previous value keeps being served.
///
/// Clones share the same slot.
///
/// # Example
///
/// ```
/// use stalebox::TimedCache;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), stalebox::CacheError> {
/// let cache = TimedCache::builder(|| async { Ok::<_, std::io::Error>(42u64) })
///     .staleness(Duration::from_secs(60))
///     .build();
///
/// assert_eq!(cache.get().await?, 42);
/// # Ok(())
/// # }
/// ```
pub struct TimedCache<S: Source, C = MonotonicClock, O = OffloadManager> {
    shared: Arc<Shared<S, C>>,
    offload: O,
}

impl<S: Source, C, O: Clone> Clone for TimedCache<S, C, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            offload: self.offload.clone(),
        }
    }
}

impl<S: Source, C, O> std::fmt::Debug for TimedCache<S, C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entry = self.shared.entry.lock();
        f.debug_struct("TimedCache")
            .field("policy", &self.shared.policy)
            .field("populated", &!entry.is_empty())
            .field("refreshing", &entry.is_refreshing())
            .finish()
    }
}

impl<S> TimedCache<S>
where
    S: Source,
    S::Value: Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    /// Creates a cache with the default policy, a monotonic clock and a
    /// default [`OffloadManager`].
    pub fn new(source: S) -> Self {
        Self::builder(source).build()
    }

    /// Creates a cache with the given staleness threshold.
    pub fn with_staleness(source: S, staleness: Duration) -> Self {
        Self::builder(source).staleness(staleness).build()
    }

    /// Starts building a cache around `source`.
    pub fn builder(source: S) -> TimedCacheBuilder<S> {
        TimedCacheBuilder::new(source)
    }
}

impl<S, C, O> TimedCache<S, C, O>
where
    S: Source,
    S::Value: Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    C: Clock,
    O: Offload,
{
    /// Returns the cached value.
    ///
    /// Fails only while no value has ever been computed and the computation
    /// performed by this call fails. The slot stays empty in that case, so
    /// the next call computes again.
    ///
    /// Any executor can drive the returned future. A stale read outside a
    /// tokio runtime still returns the held value, but the default
    /// [`OffloadManager`] has nowhere to run the refresh and drops it, so the
    /// value is only replaced once a read happens inside a runtime.
    pub async fn get(&self) -> Result<S::Value, CacheError> {
        self.get_with_status().await.map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also reporting how the read was served.
    pub async fn get_with_status(&self) -> Result<(S::Value, CacheStatus), CacheError> {
        let lookup = self.lookup();
        let served = match self.serve(lookup) {
            Some(served) => Ok(served),
            None => self.cold_start().await,
        };
        if let Ok((_, status)) = &served {
            metrics::record_read(*status);
        }
        served
    }

    /// Returns the current value without computing or refreshing it.
    pub fn peek(&self) -> Option<S::Value> {
        self.shared.entry.lock().value()
    }

    /// Time since the current value was computed.
    pub fn age(&self) -> Option<Duration> {
        let entry = self.shared.entry.lock();
        entry.age(self.shared.clock.now())
    }

    /// Whether a background refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.shared.entry.lock().is_refreshing()
    }

    /// The staleness threshold.
    pub fn staleness(&self) -> Duration {
        self.shared.policy.staleness
    }

    /// The policy this cache was built with.
    pub fn policy(&self) -> &CachePolicy {
        &self.shared.policy
    }

    /// The worker pool refreshes are submitted to.
    pub fn offload(&self) -> &O {
        &self.offload
    }

    fn lookup(&self) -> Lookup<S::Value> {
        let mut entry = self.shared.entry.lock();
        entry.lookup(self.shared.clock.now(), &self.shared.policy)
    }

    /// Turns a lookup into a response, starting a refresh if this reader
    /// claimed one. Returns `None` for an empty slot.
    fn serve(&self, lookup: Lookup<S::Value>) -> Option<(S::Value, CacheStatus)> {
        match lookup {
            Lookup::Empty => None,
            Lookup::Fresh(value) => Some((value, CacheStatus::Hit)),
            Lookup::Stale { value, refresh: claimed } => {
                if claimed {
                    debug!("value is stale, starting background refresh");
                    refresh::spawn(&self.shared, &self.offload);
                }
                Some((value, CacheStatus::Stale))
            }
        }
    }

    async fn cold_start(&self) -> Result<(S::Value, CacheStatus), CacheError> {
        match self.shared.policy.cold_start {
            ColdStartPolicy::SingleFlight => {
                let _permit = self.shared.cold_start.lock().await;
                // Populated by the caller that held the permit before us.
                if let Some(served) = self.serve(self.lookup()) {
                    return Ok(served);
                }
                self.compute().await
            }
            ColdStartPolicy::Concurrent => self.compute().await,
        }
    }

    async fn compute(&self) -> Result<(S::Value, CacheStatus), CacheError> {
        debug!("cache is cold, computing value");
        match refresh::load(&self.shared.source).await {
            Ok(value) => {
                let mut entry = self.shared.entry.lock();
                entry.store(value.clone(), self.shared.clock.now());
                Ok((value, CacheStatus::Miss))
            }
            Err(error) => {
                debug!(%error, "cold-start computation failed");
                metrics::record_cold_start_failure();
                Err(error)
            }
        }
    }
}

/// Builder for [`TimedCache`].
///
/// Use [`TimedCache::builder()`] to create a new builder.
pub struct TimedCacheBuilder<S, C = MonotonicClock, O = OffloadManager> {
    source: S,
    clock: C,
    offload: O,
    policy: CachePolicy,
}

impl<S: Source> TimedCacheBuilder<S> {
    /// Creates a builder with the default policy, clock and worker pool.
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: MonotonicClock,
            offload: OffloadManager::default(),
            policy: CachePolicy::default(),
        }
    }
}

impl<S, C, O> TimedCacheBuilder<S, C, O> {
    /// Sets the clock staleness is measured with.
    pub fn clock<NewC: Clock>(self, clock: NewC) -> TimedCacheBuilder<S, NewC, O> {
        TimedCacheBuilder {
            source: self.source,
            clock,
            offload: self.offload,
            policy: self.policy,
        }
    }

    /// Sets the worker pool background refreshes run on.
    pub fn offload<NewO: Offload>(self, offload: NewO) -> TimedCacheBuilder<S, C, NewO> {
        TimedCacheBuilder {
            source: self.source,
            clock: self.clock,
            offload,
            policy: self.policy,
        }
    }

    /// Sets the whole cache policy.
    pub fn policy(self, policy: CachePolicy) -> Self {
        Self { policy, ..self }
    }

    /// Sets the staleness threshold.
    pub fn staleness(mut self, staleness: Duration) -> Self {
        self.policy.staleness = staleness;
        self
    }

    /// Sets the cold-start policy.
    pub fn cold_start(mut self, cold_start: ColdStartPolicy) -> Self {
        self.policy.cold_start = cold_start;
        self
    }
}

impl<S, C, O> TimedCacheBuilder<S, C, O>
where
    S: Source,
    C: Clock,
    O: Offload,
{
    /// Builds the [`TimedCache`].
    pub fn build(self) -> TimedCache<S, C, O> {
        TimedCache {
            shared: Arc::new(Shared {
                source: self.source,
                clock: self.clock,
                policy: self.policy,
                entry: Mutex::new(CacheEntry::default()),
                cold_start: tokio::sync::Mutex::new(()),
            }),
            offload: self.offload,
        }
    }
}
