//! The single cache slot.

use std::time::{Duration, Instant};

use crate::policy::CachePolicy;

/// A successfully computed value and when it was computed.
#[derive(Debug, Clone)]
struct Computed<T> {
    value: T,
    computed_at: Instant,
}

/// What a read found in the slot.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Lookup<T> {
    /// Nothing has been computed yet.
    Empty,
    /// The value is younger than the staleness threshold.
    Fresh(T),
    /// The value reached the threshold.
    ///
    /// `refresh` is `true` for exactly one reader per stale period: the one
    /// that flipped the in-flight flag and must start the reload.
    Stale { value: T, refresh: bool },
}

/// Slot state guarded by the cache's entry lock.
///
/// The value and its timestamp live in one `Option`, so one can never be
/// present without the other.
#[derive(Debug)]
pub(crate) struct CacheEntry<T> {
    computed: Option<Computed<T>>,
    refresh_in_flight: bool,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            computed: None,
            refresh_in_flight: false,
        }
    }
}

impl<T: Clone> CacheEntry<T> {
    /// Classifies the slot at `now` and claims the refresh if one is due.
    pub(crate) fn lookup(&mut self, now: Instant, policy: &CachePolicy) -> Lookup<T> {
        let Some(computed) = &self.computed else {
            return Lookup::Empty;
        };
        let age = now.saturating_duration_since(computed.computed_at);
        if !policy.is_stale(age) {
            return Lookup::Fresh(computed.value.clone());
        }
        let refresh = !self.refresh_in_flight;
        self.refresh_in_flight = true;
        Lookup::Stale {
            value: computed.value.clone(),
            refresh,
        }
    }

    pub(crate) fn value(&self) -> Option<T> {
        self.computed.as_ref().map(|c| c.value.clone())
    }
}

impl<T> CacheEntry<T> {
    /// Replaces the value. The latest store wins.
    pub(crate) fn store(&mut self, value: T, now: Instant) {
        self.computed = Some(Computed {
            value,
            computed_at: now,
        });
    }

    pub(crate) fn finish_refresh(&mut self) {
        self.refresh_in_flight = false;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.computed.is_none()
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.refresh_in_flight
    }

    pub(crate) fn age(&self, now: Instant) -> Option<Duration> {
        self.computed
            .as_ref()
            .map(|c| now.saturating_duration_since(c.computed_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(ms: u64) -> CachePolicy {
        CachePolicy::builder()
            .staleness(Duration::from_millis(ms))
            .build()
    }

    #[test]
    fn empty_until_stored() {
        let mut entry = CacheEntry::<u32>::default();
        let now = Instant::now();
        assert_eq!(entry.lookup(now, &policy(100)), Lookup::Empty);
        assert_eq!(entry.age(now), None);

        entry.store(1, now);
        assert_eq!(entry.lookup(now, &policy(100)), Lookup::Fresh(1));
        assert_eq!(entry.age(now), Some(Duration::ZERO));
    }

    #[test]
    fn only_first_stale_reader_claims_refresh() {
        let mut entry = CacheEntry::default();
        let start = Instant::now();
        entry.store("old", start);

        let later = start + Duration::from_millis(100);
        assert_eq!(
            entry.lookup(later, &policy(100)),
            Lookup::Stale {
                value: "old",
                refresh: true
            }
        );
        assert_eq!(
            entry.lookup(later, &policy(100)),
            Lookup::Stale {
                value: "old",
                refresh: false
            }
        );
        assert!(entry.is_refreshing());

        entry.finish_refresh();
        assert!(matches!(
            entry.lookup(later, &policy(100)),
            Lookup::Stale { refresh: true, .. }
        ));
    }

    #[test]
    fn store_resets_staleness() {
        let mut entry = CacheEntry::default();
        let start = Instant::now();
        entry.store(1, start);

        let refreshed_at = start + Duration::from_millis(150);
        entry.store(2, refreshed_at);
        assert_eq!(
            entry.lookup(refreshed_at + Duration::from_millis(99), &policy(100)),
            Lookup::Fresh(2)
        );
    }

    #[test]
    fn fresh_reads_do_not_claim_refresh() {
        let mut entry = CacheEntry::default();
        let start = Instant::now();
        entry.store(1, start);
        entry.lookup(start + Duration::from_millis(50), &policy(100));
        assert!(!entry.is_refreshing());
    }
}
