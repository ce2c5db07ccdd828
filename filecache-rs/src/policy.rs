//! Provides the eviction policies which decide which idle handles are closed first.
//!
//! Both policies only ever rank slots which are currently unlocked. The cache then claims each
//! candidate via its lock bit before destroying it, so that a slot which was handed out again in
//! the meantime is skipped. Therefore no policy can ever close a handle which is in use.
//!
//! * [LruPolicy](LruPolicy) orders all idle slots by the time of their last release.
//! * [RecencyPolicy](RecencyPolicy) tracks when each **key** was last used and evicts whole
//!   buckets, starting with the key which hasn't been asked for the longest time.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

use crate::slot::Candidate;

/// Decides in which order idle slots are evicted.
pub trait EvictionPolicy: Send + Sync {
    /// Returns the strategy implemented by this policy.
    fn strategy(&self) -> Strategy;

    /// Invoked whenever a handle for the given key is handed out.
    fn record_access(&self, _key: &str) {}

    /// Invoked once the bucket for the given key has been removed.
    fn record_removal(&self, _key: &str) {}

    /// Invoked once the whole cache has been emptied.
    fn clear(&self) {}

    /// Sorts the given candidates so that the most evictable one comes first.
    fn rank(&self, candidates: &mut [Candidate]);
}

/// Enumerates the available eviction strategies.
///
/// # Examples
/// ```
/// # use filecache::policy::Strategy;
/// assert_eq!("lru".parse::<Strategy>().unwrap(), Strategy::Lru);
/// assert_eq!("Recency".parse::<Strategy>().unwrap(), Strategy::Recency);
/// assert_eq!("fifo".parse::<Strategy>().is_err(), true);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Evicts the slots which have been idle the longest.
    #[default]
    Lru,
    /// Evicts whole buckets in the order their keys have been used.
    Recency,
}

impl Strategy {
    /// Creates a fresh policy implementing this strategy.
    pub fn create(self) -> Box<dyn EvictionPolicy> {
        match self {
            Strategy::Lru => Box::new(LruPolicy),
            Strategy::Recency => Box::new(RecencyPolicy::new()),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "lru" => Ok(Strategy::Lru),
            "recency" | "adaptive" => Ok(Strategy::Recency),
            _ => Err(anyhow::anyhow!(
                "Unknown eviction strategy '{}'. Use either 'lru' or 'recency'.",
                value
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Lru => write!(f, "lru"),
            Strategy::Recency => write!(f, "recency"),
        }
    }
}

/// Evicts the slots which have been idle the longest, regardless of their key.
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Lru
    }

    fn rank(&self, candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| a.cmp_by_access(b));
    }
}

/// Evicts whole buckets, starting with the key which has been used least recently.
///
/// Each hit moves the key to the most recent end of an ordered map. Within a bucket, slots are
/// ranked by their idle time.
pub struct RecencyPolicy {
    order: Mutex<LinkedHashMap<String, ()>>,
}

impl RecencyPolicy {
    /// Creates a new policy without any known keys.
    pub fn new() -> Self {
        RecencyPolicy {
            order: Mutex::new(LinkedHashMap::new()),
        }
    }

    /// Returns the known keys, least recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.order.lock().keys().cloned().collect()
    }
}

impl Default for RecencyPolicy {
    fn default() -> Self {
        RecencyPolicy::new()
    }
}

impl EvictionPolicy for RecencyPolicy {
    fn strategy(&self) -> Strategy {
        Strategy::Recency
    }

    fn record_access(&self, key: &str) {
        let mut order = self.order.lock();
        if order.get_refresh(key).is_none() {
            let _ = order.insert(key.to_owned(), ());
        }
    }

    fn record_removal(&self, key: &str) {
        let _ = self.order.lock().remove(key);
    }

    fn clear(&self) {
        self.order.lock().clear();
    }

    fn rank(&self, candidates: &mut [Candidate]) {
        let positions: HashMap<String, usize> = self
            .order
            .lock()
            .keys()
            .enumerate()
            .map(|(position, key)| (key.clone(), position + 1))
            .collect();

        // Keys we do not know (anymore) are treated as the least recently used ones. Slots of
        // the same key are kept together so that whole buckets are evicted...
        candidates.sort_by(|a, b| {
            let position_a = positions.get(a.key()).copied().unwrap_or(0);
            let position_b = positions.get(b.key()).copied().unwrap_or(0);
            position_a
                .cmp(&position_b)
                .then_with(|| a.key().cmp(b.key()))
                .then_with(|| a.cmp_by_access(b))
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::{EvictionPolicy, LruPolicy, RecencyPolicy, Strategy};
    use crate::slot::{Candidate, Slot};
    use crate::testing::MockHandle;
    use mock_instant::thread_local::MockClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn candidates(keys: &[&str]) -> Vec<Candidate> {
        keys.iter()
            .enumerate()
            .map(|(index, key)| {
                MockClock::advance(Duration::from_secs(1));
                let slot = Slot::new(key, Arc::new(MockHandle::new(key)));
                Candidate::new(&slot, index)
            })
            .collect()
    }

    fn ranked_keys(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|candidate| candidate.key()).collect()
    }

    #[test]
    fn lru_ranks_by_idle_time() {
        // Candidates are created oldest first, so we shuffle them a bit...
        let mut candidates = candidates(&["a", "b", "c"]);
        candidates.reverse();

        LruPolicy.rank(&mut candidates);
        assert_eq!(ranked_keys(&candidates), vec!["a", "b", "c"]);
    }

    #[test]
    fn recency_ranks_whole_buckets() {
        let policy = RecencyPolicy::new();
        policy.record_access("a");
        policy.record_access("b");
        policy.record_access("c");

        // Using "a" again makes "b" the least recently used key...
        policy.record_access("a");
        assert_eq!(policy.keys(), vec!["b", "c", "a"]);

        // Two slots for "a" are older than everything else, but as "a" was used last, its
        // bucket is evicted last...
        let mut candidates = candidates(&["a", "a", "b", "c"]);
        policy.rank(&mut candidates);
        assert_eq!(ranked_keys(&candidates), vec!["b", "c", "a", "a"]);

        policy.record_removal("b");
        assert_eq!(policy.keys(), vec!["c", "a"]);

        policy.clear();
        assert_eq!(policy.keys().is_empty(), true);
    }

    #[test]
    fn unknown_keys_are_ranked_first() {
        let policy = RecencyPolicy::new();
        policy.record_access("a");
        policy.record_access("b");

        // "x" is created first (and therefore idle the longest), "y" is created last...
        let mut candidates = candidates(&["x", "a", "y", "b", "x"]);
        policy.rank(&mut candidates);
        assert_eq!(ranked_keys(&candidates), vec!["x", "x", "y", "a", "b"]);
    }

    #[test]
    fn strategies_create_matching_policies() {
        assert_eq!(Strategy::Lru.create().strategy(), Strategy::Lru);
        assert_eq!(Strategy::Recency.create().strategy(), Strategy::Recency);
        assert_eq!(Strategy::default(), Strategy::Lru);
        assert_eq!(Strategy::Recency.to_string(), "recency");
    }
}
