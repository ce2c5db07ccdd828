//! Contains the metrics and diagnostics reported by a cache.
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

/// Provides the central metrics of a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Contains the number of requests which were served by a cached handle.
    pub hits: u64,
    /// Contains the number of requests which had to open a new handle.
    pub misses: u64,
    /// Contains the number of handles closed by cleanups.
    pub evictions: u64,
    /// Contains the number of handles currently kept by the cache (in use or idle).
    pub live: usize,
    /// Contains the number of distinct keys currently present.
    pub buckets: usize,
}

impl CacheStats {
    /// Returns the cache hit rate in percent.
    ///
    /// # Examples
    /// ```
    /// # use filecache::stats::CacheStats;
    /// let stats = CacheStats { hits: 3, misses: 1, ..Default::default() };
    /// assert_eq!(stats.hit_rate().round() as i32, 75);
    /// assert_eq!(CacheStats::default().hit_rate(), 0.);
    /// ```
    pub fn hit_rate(&self) -> f32 {
        match self.hits + self.misses {
            0 => 0.,
            n => self.hits as f32 / n as f32 * 100.,
        }
    }
}

/// Reports the hits and misses recorded for a single location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerSummary {
    /// Contains the location being tracked.
    pub location: String,
    /// Contains the number of requests served from the cache.
    pub hits: u64,
    /// Contains the number of requests which opened a new handle.
    pub misses: u64,
}

impl TrackerSummary {
    /// Returns the total number of requests for this location.
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Default)]
struct Tracker {
    hits: u64,
    misses: u64,
}

/// Records hits and misses per location if enabled.
#[derive(Default)]
pub(crate) struct Tracking {
    enabled: AtomicBool,
    trackers: DashMap<String, Tracker>,
}

impl Tracking {
    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn record(&self, location: &str, hit: bool) {
        if !self.is_enabled() {
            return;
        }

        let mut tracker = self.trackers.entry(location.to_owned()).or_default();
        if hit {
            tracker.hits += 1;
        } else {
            tracker.misses += 1;
        }
    }

    pub(crate) fn reset(&self) {
        self.trackers.clear();
    }

    /// Returns all trackers, the most requested locations first.
    pub(crate) fn summaries(&self) -> Vec<TrackerSummary> {
        let mut result: Vec<TrackerSummary> = self
            .trackers
            .iter()
            .map(|entry| TrackerSummary {
                location: entry.key().clone(),
                hits: entry.value().hits,
                misses: entry.value().misses,
            })
            .collect();

        result.sort_by(|a, b| {
            b.total()
                .cmp(&a.total())
                .then_with(|| a.location.cmp(&b.location))
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use crate::stats::Tracking;

    #[test]
    fn tracking_is_only_recorded_if_enabled() {
        let tracking = Tracking::default();
        tracking.record("a", true);
        assert_eq!(tracking.summaries().is_empty(), true);

        tracking.set_enabled(true);
        tracking.record("a", false);
        tracking.record("a", true);
        tracking.record("b", true);
        tracking.record("c", true);
        tracking.record("c", true);
        tracking.record("c", false);

        let summaries = tracking.summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].location, "c");
        assert_eq!(summaries[0].hits, 2);
        assert_eq!(summaries[0].misses, 1);
        assert_eq!(summaries[1].location, "a");
        assert_eq!(summaries[2].total(), 1);

        tracking.reset();
        assert_eq!(tracking.summaries().is_empty(), true);
    }
}
