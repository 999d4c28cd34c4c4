use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Staleness threshold used when none is configured.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(30);

/// How concurrent readers of a cold cache compute the first value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartPolicy {
    /// One reader computes; the others wait for it and re-check the slot.
    ///
    /// If the computing reader fails, the next waiter computes in turn.
    #[default]
    SingleFlight,
    /// Every cold reader computes on its own; the last successful store wins.
    Concurrent,
}

/// Cache behavior policy.
///
/// Deserializes from human-readable durations:
///
/// ```
/// use stalebox::policy::{CachePolicy, ColdStartPolicy};
/// use std::time::Duration;
///
/// let policy: CachePolicy =
///     serde_json::from_str(r#"{"staleness": "100ms", "cold_start": "concurrent"}"#).unwrap();
/// assert_eq!(policy.staleness, Duration::from_millis(100));
/// assert_eq!(policy.cold_start, ColdStartPolicy::Concurrent);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CachePolicy {
    /// Age after which a cached value triggers a background refresh (e.g., "30s", "500ms").
    #[serde(default = "default_staleness", with = "humantime_serde")]
    pub staleness: Duration,
    /// Cold-start behavior.
    #[serde(default)]
    pub cold_start: ColdStartPolicy,
}

fn default_staleness() -> Duration {
    DEFAULT_STALENESS
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            cold_start: ColdStartPolicy::default(),
        }
    }
}

impl CachePolicy {
    /// Create a new builder for CachePolicy.
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// Whether a value of the given age must be refreshed.
    ///
    /// A value is stale from the exact moment its age reaches the threshold.
    #[inline]
    pub fn is_stale(&self, age: Duration) -> bool {
        age >= self.staleness
    }
}

/// Builder for CachePolicy.
#[derive(Debug, Clone, Default)]
pub struct CachePolicyBuilder {
    policy: CachePolicy,
}

impl CachePolicyBuilder {
    /// Set the staleness threshold.
    pub fn staleness(mut self, staleness: Duration) -> Self {
        self.policy.staleness = staleness;
        self
    }

    /// Set the cold-start policy.
    pub fn cold_start(mut self, cold_start: ColdStartPolicy) -> Self {
        self.policy.cold_start = cold_start;
        self
    }

    /// Build the CachePolicy.
    pub fn build(self) -> CachePolicy {
        self.policy
    }
}
