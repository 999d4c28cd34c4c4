//! Metrics declaration and initialization.

use std::time::Duration;

use crate::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Read status metrics

    /// Track number of fresh reads.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stalebox_cache_hit_total",
            "Total number of reads served from a fresh value."
        );
        "stalebox_cache_hit_total"
    };
    /// Track number of cold-start reads.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stalebox_cache_miss_total",
            "Total number of reads that had to compute the value."
        );
        "stalebox_cache_miss_total"
    };
    /// Track number of stale reads.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stalebox_cache_stale_total",
            "Total number of reads served from a stale value."
        );
        "stalebox_cache_stale_total"
    };
    /// Track number of failed cold-start computations.
    pub static ref COLD_START_FAILURES: &'static str = {
        metrics::describe_counter!(
            "stalebox_cold_start_failures_total",
            "Total number of cold-start computations that failed."
        );
        "stalebox_cold_start_failures_total"
    };

    // Refresh metrics

    /// Track number of background refreshes triggered.
    pub static ref REFRESH_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "stalebox_refresh_spawned_total",
            "Total number of background refreshes triggered."
        );
        "stalebox_refresh_spawned_total"
    };
    /// Track number of background refreshes that committed a new value.
    pub static ref REFRESH_SUCCEEDED: &'static str = {
        metrics::describe_counter!(
            "stalebox_refresh_succeeded_total",
            "Total number of background refreshes that committed a new value."
        );
        "stalebox_refresh_succeeded_total"
    };
    /// Track number of background refreshes that failed.
    pub static ref REFRESH_FAILED: &'static str = {
        metrics::describe_counter!(
            "stalebox_refresh_failed_total",
            "Total number of background refreshes that failed."
        );
        "stalebox_refresh_failed_total"
    };
    /// Histogram of background refresh duration.
    pub static ref REFRESH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "stalebox_refresh_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of background refreshes in seconds."
        );
        "stalebox_refresh_duration_seconds"
    };

    // Offload manager metrics

    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "stalebox_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "stalebox_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "stalebox_offload_tasks_completed_total",
            "Total number of offload tasks completed."
        );
        "stalebox_offload_tasks_completed_total"
    };
    /// Gauge of currently active offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "stalebox_offload_tasks_active",
            "Number of currently active offload tasks."
        );
        "stalebox_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "stalebox_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "stalebox_offload_task_duration_seconds"
    };
}

/// Record how a read was served.
///
/// When the `metrics` feature is disabled, this function is a no-op
/// and will be eliminated by the compiler.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_read(status: CacheStatus) {
    let counter = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Stale => *CACHE_STALE_COUNTER,
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_read(_status: CacheStatus) {}

/// Record a failed cold-start computation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cold_start_failure() {
    metrics::counter!(*COLD_START_FAILURES).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cold_start_failure() {}

/// Record that a background refresh was handed to the worker pool.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_refresh_spawned() {
    metrics::counter!(*REFRESH_SPAWNED).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_refresh_spawned() {}

/// Record the outcome of a background refresh.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_refresh_outcome(succeeded: bool, duration: Duration) {
    let counter = if succeeded {
        *REFRESH_SUCCEEDED
    } else {
        *REFRESH_FAILED
    };
    metrics::counter!(counter).increment(1);
    metrics::histogram!(*REFRESH_DURATION).record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_refresh_outcome(_succeeded: bool, _duration: Duration) {}
