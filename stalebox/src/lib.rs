#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The cache itself.
///
/// [`TimedCache`] holds one value computed by a [`Source`], serves it while it
/// is fresh, and keeps serving it while a background refresh replaces it once
/// it is stale.
pub mod cache;

mod entry;

/// Error types for cache reads.
///
/// Defines [`CacheError`], returned only while the cache is cold:
/// - Computation errors (the source failed)
/// - Panics raised by the source
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Reads by status (hit, miss, stale)
/// - Background refresh outcomes and timing
/// - Offload task activity
pub mod metrics;

/// Background task offloading for stale-while-revalidate.
///
/// Stale values are served immediately while their replacement is computed on
/// a worker pool. This module provides the default pool,
/// [`OffloadManager`](offload::OffloadManager).
pub mod offload;

/// Policy configuration for cache behavior.
///
/// Defines [`CachePolicy`](policy::CachePolicy) with:
/// - **Staleness** - age after which a value is refreshed in the background
/// - **Cold start** - whether concurrent first readers share one computation
pub mod policy;

mod refresh;

pub use cache::{TimedCache, TimedCacheBuilder};
pub use error::{BoxError, CacheError};
pub use policy::{CachePolicy, ColdStartPolicy, DEFAULT_STALENESS};
pub use stalebox_core::{CacheStatus, Clock, ManualClock, MonotonicClock, Offload, Source};

/// Clock trait and implementations.
///
/// Re-exports from [`stalebox-core`](stalebox_core).
pub mod clock {
    pub use stalebox_core::clock::{Clock, ManualClock, MonotonicClock};
}

/// The `stalebox` prelude.
///
/// ```rust
/// use stalebox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CacheError, CacheStatus, Clock, Source, TimedCache};
}
