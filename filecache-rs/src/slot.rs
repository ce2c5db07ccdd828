//! Contains the bookkeeping structures of the cache.
//!
//! A [Slot](Slot) wraps a single live handle along with its lock bit and access statistics. All
//! slots which share a cache key are kept in a [Bucket](Bucket), so that several copies of the
//! same logical resource can be open at the same time.
//!
//! Claiming a slot (either to hand it out or to destroy it) is a single compare-and-swap on its
//! lock bit. Only the winner may touch the handle, everybody else has to move on.
#[cfg(test)]
use mock_instant::thread_local::Instant;
#[cfg(not(test))]
use std::time::Instant;

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, MutexGuard};

use crate::handle::{identity, Handle};

/// Wraps a live handle.
pub(crate) struct Slot<H: Handle> {
    id: usize,
    key: String,
    handle: Arc<H>,
    locked: AtomicBool,
    last_modified: Option<SystemTime>,
    access: Mutex<Access>,
}

struct Access {
    last_accessed: Instant,
    access_count: u64,
}

impl<H: Handle> Slot<H> {
    /// Creates a new slot which is already locked for the caller which opened the handle.
    pub(crate) fn new(key: &str, handle: Arc<H>) -> Self {
        Slot {
            id: identity(&handle),
            key: key.to_owned(),
            last_modified: handle.last_modified(),
            handle,
            locked: AtomicBool::new(true),
            access: Mutex::new(Access {
                last_accessed: Instant::now(),
                access_count: 0,
            }),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn handle(&self) -> &Arc<H> {
        &self.handle
    }

    /// Tries to claim the slot by flipping its lock bit from **false** to **true**.
    pub(crate) fn try_claim(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub(crate) fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Determines if the underlying resource changed since the handle was opened.
    ///
    /// If no timestamp was known at open time, the handle is never considered stale.
    pub(crate) fn is_stale(&self) -> bool {
        match self.last_modified {
            Some(recorded) => self.handle.last_modified() != Some(recorded),
            None => false,
        }
    }

    /// Records an access (which is a release of the handle).
    pub(crate) fn touch(&self) {
        let mut access = self.access.lock();
        access.last_accessed = Instant::now();
        access.access_count += 1;
    }

    pub(crate) fn access_count(&self) -> u64 {
        self.access.lock().access_count
    }

    pub(crate) fn last_accessed(&self) -> Instant {
        self.access.lock().last_accessed
    }

    pub(crate) fn idle(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_accessed())
    }

    pub(crate) fn summary(&self) -> SlotSummary {
        SlotSummary {
            key: self.key.clone(),
            location: self.handle.location().to_owned(),
            locked: self.is_locked(),
            access_count: self.access_count(),
            idle: self.idle(),
            last_modified: self.last_modified,
        }
    }
}

/// Keeps all slots which share a cache key.
pub(crate) struct Bucket<H: Handle> {
    state: Mutex<BucketState<H>>,
}

pub(crate) struct BucketState<H: Handle> {
    pub(crate) slots: Vec<Arc<Slot<H>>>,

    /// Set once the bucket was taken out of the key index. A removed bucket must never accept
    /// new slots.
    pub(crate) removed: bool,
}

impl<H: Handle> Bucket<H> {
    pub(crate) fn new() -> Self {
        Bucket {
            state: Mutex::new(BucketState {
                slots: Vec::new(),
                removed: false,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, BucketState<H>> {
        self.state.lock()
    }

    /// Adds the given slot unless the bucket has already been removed.
    pub(crate) fn push(&self, slot: Arc<Slot<H>>) -> bool {
        let mut state = self.state.lock();
        if state.removed {
            false
        } else {
            state.slots.push(slot);
            true
        }
    }

    /// Returns a copy of the current slot list so that it can be scanned without holding the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Slot<H>>> {
        self.state.lock().slots.clone()
    }
}

/// Describes an unlocked slot which may be evicted.
///
/// Instances are handed to an [EvictionPolicy](crate::policy::EvictionPolicy) which sorts them
/// so that the most evictable candidate comes first.
#[derive(Clone)]
pub struct Candidate {
    key: String,
    last_accessed: Instant,
    pub(crate) index: usize,
}

impl Candidate {
    pub(crate) fn new<H: Handle>(slot: &Slot<H>, index: usize) -> Self {
        Candidate {
            key: slot.key().to_owned(),
            last_accessed: slot.last_accessed(),
            index,
        }
    }

    /// Returns the cache key of the slot.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Compares two candidates by the time of their last access (least recent first).
    pub fn cmp_by_access(&self, other: &Candidate) -> CmpOrdering {
        self.last_accessed.cmp(&other.last_accessed)
    }
}

/// Provides a snapshot of a single slot as reported by [show_cache](crate::cache::FileCache::show_cache).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSummary {
    /// Contains the cache key.
    pub key: String,
    /// Contains the location of the handle.
    pub location: String,
    /// Determines if the handle is currently in use.
    pub locked: bool,
    /// Contains the number of times the handle has been released back into the cache.
    pub access_count: u64,
    /// Contains the time since the handle was last released (or opened).
    pub idle: Duration,
    /// Contains the modification timestamp recorded when the handle was opened.
    pub last_modified: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use crate::slot::{Bucket, Candidate, Slot};
    use crate::testing::MockHandle;
    use mock_instant::thread_local::MockClock;
    use std::cmp::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    #[test]
    fn slots_are_created_locked_and_claimed_exactly_once() {
        let slot = Slot::new("a", Arc::new(MockHandle::new("a")));
        assert_eq!(slot.is_locked(), true);
        assert_eq!(slot.try_claim(), false);

        slot.unlock();
        assert_eq!(slot.try_claim(), true);
        assert_eq!(slot.try_claim(), false);
    }

    #[test]
    fn staleness_follows_the_modification_probe() {
        let handle = Arc::new(MockHandle::new("a"));
        handle.set_last_modified(Some(SystemTime::UNIX_EPOCH));
        let slot = Slot::new("a", handle.clone());
        assert_eq!(slot.is_stale(), false);

        handle.set_last_modified(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1)));
        assert_eq!(slot.is_stale(), true);

        // Without a known timestamp, a handle is never considered stale...
        let unknown = Arc::new(MockHandle::new("b"));
        let slot = Slot::new("b", unknown.clone());
        unknown.set_last_modified(Some(SystemTime::now()));
        assert_eq!(slot.is_stale(), false);
    }

    #[test]
    fn touching_updates_access_statistics() {
        let slot = Slot::new("a", Arc::new(MockHandle::new("a")));
        let opened = slot.last_accessed();

        MockClock::advance(Duration::from_secs(5));
        assert_eq!(slot.idle(), Duration::from_secs(5));

        slot.touch();
        assert_eq!(slot.access_count(), 1);
        assert_eq!(slot.last_accessed() > opened, true);
        assert_eq!(slot.idle(), Duration::ZERO);
    }

    #[test]
    fn candidates_order_by_access() {
        let older = Slot::new("a", Arc::new(MockHandle::new("a")));
        MockClock::advance(Duration::from_secs(1));
        let newer = Slot::new("b", Arc::new(MockHandle::new("b")));

        let older = Candidate::new(&older, 0);
        let newer = Candidate::new(&newer, 1);
        assert_eq!(older.cmp_by_access(&newer), Ordering::Less);
        assert_eq!(newer.key(), "b");
    }

    #[test]
    fn removed_buckets_reject_slots() {
        let bucket = Bucket::new();
        assert_eq!(bucket.push(Arc::new(Slot::new("a", Arc::new(MockHandle::new("a"))))), true);
        assert_eq!(bucket.snapshot().len(), 1);

        bucket.lock().removed = true;
        assert_eq!(bucket.push(Arc::new(Slot::new("a", Arc::new(MockHandle::new("a"))))), false);
        assert_eq!(bucket.snapshot().len(), 1);
    }
}
