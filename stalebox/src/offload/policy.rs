//! Settings for [`OffloadManager`](super::OffloadManager).

use std::time::Duration;

/// What to do about a background task that runs for a long time.
///
/// Tasks are never cancelled by the manager: a refresh that is cut short
/// would only waste the work already done on it.
#[derive(Debug, Clone, Default)]
pub enum TimeoutPolicy {
    /// Stay silent however long the task takes.
    #[default]
    None,
    /// Log a warning for tasks that finish after this long.
    Warn(Duration),
}

/// Settings shared by every task of one manager.
#[derive(Debug, Clone, Default)]
pub struct OffloadConfig {
    /// Slow-task handling.
    pub timeout_policy: TimeoutPolicy,
}

impl OffloadConfig {
    /// Starts from the defaults: no slow-task warnings.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Builder returned by [`OffloadConfig::builder`].
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    timeout_policy: TimeoutPolicy,
}

impl OffloadConfigBuilder {
    /// Same as [`OffloadConfig::builder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slow-task handling.
    pub fn timeout_policy(self, policy: TimeoutPolicy) -> Self {
        Self {
            timeout_policy: policy,
        }
    }

    /// Warn about tasks running longer than `duration`.
    pub fn warn_after(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Warn(duration))
    }

    /// Finishes the configuration.
    pub fn build(self) -> OffloadConfig {
        OffloadConfig {
            timeout_policy: self.timeout_policy,
        }
    }
}
