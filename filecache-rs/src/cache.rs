//! Provides a cache which keeps expensive handles open for reuse.
//!
//! A [FileCache](FileCache) maps a key (which defaults to the location of the resource) onto a
//! bucket of slots. Each slot wraps one open handle, therefore several callers can use the same
//! file at the same time, each with its own handle. A slot is either **locked** (handed out to
//! exactly one caller) or **idle** (waiting in the cache to be reused).
//!
//! # Acquiring and releasing
//! [acquire](FileCache::acquire) scans the bucket of the requested key and claims the first idle
//! slot. If the resource changed on disk since the handle was opened, the handle is discarded and
//! the search continues. If no usable slot is found, a new handle is opened via the given
//! [Factory](crate::handle::Factory) and placed into a new slot (which is already locked for the
//! caller).
//!
//! Once the caller is done, it either invokes [Handle::close](crate::handle::Handle::close) (which
//! hands the handle back via its [Owner](crate::handle::Owner)) or [release](FileCache::release).
//!
//! # Limits
//! Each cache is governed by [Limits](crate::limits::Limits):
//! * Once more than **soft_limit** handles are open, a cleanup down to **min_elements** is
//!   scheduled in the background (at most one is pending at a time).
//! * Once more than **hard_limit** handles are open, the caller which opened the last handle runs
//!   a cleanup down to **hard_limit** before returning.
//! * Every **period** a cleanup down to **min_elements** is run in the background.
//!
//! A cleanup only ever closes idle handles. If too many handles are in use, the target cannot be
//! reached, which is reported as a warning.
//!
//! # Examples
//! ```
//! # use filecache::cache::FileCache;
//! # use filecache::handle::{Handle, OpenRequest};
//! # use filecache::limits::CacheSettings;
//! # use filecache::scheduler::Scheduler;
//! # use std::sync::Arc;
//! struct Resource(String);
//!
//! impl Handle for Resource {
//!     fn location(&self) -> &str {
//!         &self.0
//!     }
//!
//!     fn close(&self) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let scheduler = Scheduler::new().unwrap();
//! let cache = FileCache::new("resources", CacheSettings::default(), scheduler.clone());
//! let factory = |request: &OpenRequest| -> anyhow::Result<Resource> {
//!     Ok(Resource(request.location().to_owned()))
//! };
//!
//! let first = cache.acquire(&factory, "/data/a.nc").unwrap();
//! assert_eq!(cache.release(&first), true);
//!
//! // The same handle is handed out again...
//! let second = cache.acquire(&factory, "/data/a.nc").unwrap();
//! assert_eq!(Arc::ptr_eq(&first, &second), true);
//! assert_eq!(cache.show_stats().hits, 1);
//!
//! scheduler.shutdown();
//! ```
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::fmt::{format_duration, SEPARATOR};
use crate::handle::{identity, Cancelled, Factory, Handle, OpenRequest, Owner, Release};
use crate::limits::{CacheSettings, Limits};
use crate::policy::{EvictionPolicy, Strategy};
use crate::scheduler::{Scheduler, Task};
use crate::slot::{Bucket, Candidate, Slot, SlotSummary};
use crate::stats::{CacheStats, TrackerSummary, Tracking};

/// Determines how long to wait before running a cleanup once the soft limit has been exceeded.
const SOFT_LIMIT_CLEANUP_DELAY: Duration = Duration::from_millis(100);

/// Keeps open handles of type **H** for reuse.
pub struct FileCache<H: Handle> {
    name: String,
    me: Weak<FileCache<H>>,
    scheduler: Arc<Scheduler>,
    buckets: DashMap<String, Arc<Bucket<H>>>,
    handles: DashMap<usize, Arc<Slot<H>>>,
    live: AtomicUsize,
    settings: Mutex<CacheSettings>,
    policy: RwLock<Box<dyn EvictionPolicy>>,
    disabled: AtomicBool,
    cleanup_pending: AtomicBool,
    periodic_cleanup: Mutex<Option<Task>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    tracking: Tracking,
}

impl<H: Handle> FileCache<H> {
    /// Creates a new cache which uses the given scheduler for its background cleanups.
    pub fn new(
        name: impl Into<String>,
        settings: CacheSettings,
        scheduler: Arc<Scheduler>,
    ) -> Arc<Self> {
        let cache = Arc::new_cyclic(|me| FileCache {
            name: name.into(),
            me: me.clone(),
            scheduler,
            buckets: DashMap::new(),
            handles: DashMap::new(),
            live: AtomicUsize::new(0),
            settings: Mutex::new(settings),
            policy: RwLock::new(settings.strategy.create()),
            disabled: AtomicBool::new(false),
            cleanup_pending: AtomicBool::new(false),
            periodic_cleanup: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            tracking: Tracking::default(),
        });

        cache.tracking.set_enabled(settings.tracking);
        cache.schedule_periodic_cleanup(settings.limits.period());
        log::info!("Created cache {} ({})", cache.name, settings.describe());

        cache
    }

    /// Returns the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current settings.
    pub fn settings(&self) -> CacheSettings {
        *self.settings.lock()
    }

    /// Returns the current limits.
    pub fn limits(&self) -> Limits {
        self.settings.lock().limits
    }

    /// Returns the strategy of the eviction policy in use.
    pub fn strategy(&self) -> Strategy {
        self.policy.read().strategy()
    }

    /// Returns the number of handles kept by this cache (in use or idle).
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Determines if the cache keeps no handles at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Determines if caching is currently disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Obtains a handle for the given location.
    ///
    /// This is a shortcut for [acquire_with](FileCache::acquire_with) using a plain request.
    pub fn acquire<F>(&self, factory: &F, location: &str) -> anyhow::Result<Arc<H>>
    where
        F: Factory<H> + ?Sized,
    {
        self.acquire_with(factory, &OpenRequest::new(location))
    }

    /// Obtains a handle for the given request.
    ///
    /// Either an idle cached handle for [OpenRequest::key](OpenRequest::key) is handed out or a
    /// new one is opened via the factory. In both cases, the caller holds the handle exclusively
    /// until it is released.
    ///
    /// # Errors
    /// Fails if the factory cannot open the resource. If the request is cancelled while the
    /// resource is being opened, the new handle is closed and [Cancelled](Cancelled) is
    /// returned. In both cases nothing is cached.
    pub fn acquire_with<F>(&self, factory: &F, request: &OpenRequest) -> anyhow::Result<Arc<H>>
    where
        F: Factory<H> + ?Sized,
    {
        if self.is_disabled() {
            return self.open(factory, request).map(Arc::new);
        }

        if let Some(handle) = self.reuse(request.key()) {
            let _ = self.hits.fetch_add(1, Ordering::Relaxed);
            self.tracking.record(request.location(), true);
            return Ok(handle);
        }

        let _ = self.misses.fetch_add(1, Ordering::Relaxed);
        self.tracking.record(request.location(), false);

        let handle = Arc::new(self.open(factory, request)?);
        if !self.is_disabled() {
            self.register(request.key(), &handle);
            self.enforce_limits();
        }

        Ok(handle)
    }

    fn open<F>(&self, factory: &F, request: &OpenRequest) -> anyhow::Result<H>
    where
        F: Factory<H> + ?Sized,
    {
        let handle = factory
            .open(request)
            .with_context(|| format!("Cannot open {}", request.location()))?;

        if request.is_cancelled() {
            log::debug!(
                "Cache {}: The request for {} has been cancelled. Closing the new handle...",
                self.name,
                request.location()
            );
            if let Err(error) = handle.close() {
                log::error!(
                    "Cache {}: Failed to close {}: {}",
                    self.name,
                    request.location(),
                    error
                );
            }

            return Err(anyhow::Error::new(Cancelled));
        }

        Ok(handle)
    }

    /// Tries to claim an idle slot for the given key.
    fn reuse(&self, key: &str) -> Option<Arc<H>> {
        let bucket = self.buckets.get(key).map(|entry| entry.value().clone())?;

        for slot in bucket.snapshot() {
            if !slot.try_claim() {
                continue;
            }

            // The slot might have been destroyed by an eject or forced clear right before we
            // claimed it...
            if !self.handles.contains_key(&slot.id()) {
                continue;
            }

            if slot.is_stale() {
                log::debug!(
                    "Cache {}: {} has been modified. Discarding the cached handle...",
                    self.name,
                    slot.handle().location()
                );
                let _ = self.destroy(&slot);
                continue;
            }

            if let Err(error) = slot.handle().resume() {
                log::debug!(
                    "Cache {}: Cannot resume {} ({}). Discarding the cached handle...",
                    self.name,
                    slot.handle().location(),
                    error
                );
                let _ = self.destroy(&slot);
                continue;
            }

            self.policy.read().record_access(key);
            return Some(slot.handle().clone());
        }

        None
    }

    /// Places a freshly opened handle into a new (locked) slot.
    fn register(&self, key: &str, handle: &Arc<H>) {
        let slot = Arc::new(Slot::new(key, handle.clone()));
        let cache: Weak<dyn Release> = self.me.clone();
        handle.set_owner(Some(Owner::new(cache, slot.id())));

        let _ = self.handles.insert(slot.id(), slot.clone());
        let _ = self.live.fetch_add(1, Ordering::SeqCst);

        loop {
            let bucket = self
                .buckets
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Bucket::new()))
                .value()
                .clone();

            // A bucket which is concurrently being pruned rejects new slots, in this case we
            // simply retry with a fresh one...
            if bucket.push(slot.clone()) {
                break;
            }
            std::thread::yield_now();
        }

        self.policy.read().record_access(key);
    }

    /// Hands the given handle back to the cache.
    ///
    /// Returns **true** if the handle has been taken care of. If the cache is disabled, the
    /// handle is closed right away. Releasing a handle which isn't known to the cache or which
    /// isn't in use (e.g. a second release) is logged and yields **false** without changing
    /// anything.
    pub fn release(&self, handle: &Arc<H>) -> bool {
        self.release_handle(identity(handle))
    }

    /// Closes and removes the given slot.
    ///
    /// The caller must either have claimed the slot or be forcing its removal.
    fn destroy(&self, slot: &Arc<Slot<H>>) -> bool {
        let bucket = self.buckets.get(slot.key()).map(|entry| entry.value().clone());
        if let Some(bucket) = bucket {
            self.unlink(&bucket, slot);
        }

        self.dispose(slot)
    }

    /// Removes the slot from its bucket and prunes the bucket once it is empty.
    fn unlink(&self, bucket: &Arc<Bucket<H>>, slot: &Arc<Slot<H>>) {
        let mut state = bucket.lock();
        state.slots.retain(|other| !Arc::ptr_eq(other, slot));

        if state.slots.is_empty() && !state.removed {
            state.removed = true;
            let _ = self
                .buckets
                .remove_if(slot.key(), |_, indexed| Arc::ptr_eq(indexed, bucket));
            self.policy.read().record_removal(slot.key());
        }
    }

    /// Stops tracking the slot and actually closes its handle.
    ///
    /// Only the first invocation per slot has an effect.
    fn dispose(&self, slot: &Slot<H>) -> bool {
        if self.handles.remove(&slot.id()).is_none() {
            return false;
        }
        let _ = self.live.fetch_sub(1, Ordering::SeqCst);

        let handle = slot.handle();
        handle.set_owner(None);
        if let Err(error) = handle.close() {
            log::error!(
                "Cache {}: Failed to close {}: {}",
                self.name,
                handle.location(),
                error
            );
        }

        true
    }

    fn enforce_limits(&self) {
        let limits = self.limits();
        let live = self.len();

        if live > limits.hard_limit() {
            log::debug!(
                "Cache {}: {} handles exceed the hard limit of {}. Cleaning up...",
                self.name,
                live,
                limits.hard_limit()
            );
            let _ = self.cleanup(limits.hard_limit());
        } else if live > limits.soft_limit() && !self.cleanup_pending.swap(true, Ordering::AcqRel)
        {
            let cache = self.me.clone();
            let scheduled = self.scheduler.schedule_once(SOFT_LIMIT_CLEANUP_DELAY, move || {
                if let Some(cache) = cache.upgrade() {
                    let _ = cache.cleanup(cache.limits().min_elements());
                    cache.cleanup_pending.store(false, Ordering::Release);
                }
            });

            if !scheduled {
                log::debug!(
                    "Cache {}: The scheduler is gone. Cleaning up in the foreground...",
                    self.name
                );
                let _ = self.cleanup(limits.min_elements());
                self.cleanup_pending.store(false, Ordering::Release);
            }
        }
    }

    /// Closes idle handles until at most **target** handles remain.
    ///
    /// The eviction policy decides in which order idle handles are closed. Handles which are in
    /// use are never closed, therefore the target might not be reached. Using the recency
    /// strategy, a key is always evicted as a whole, even if this closes more handles than
    /// required to reach the target. Returns the number of closed handles.
    pub fn cleanup(&self, target: usize) -> usize {
        if self.len() <= target {
            return 0;
        }

        let slots: Vec<Arc<Slot<H>>> = self
            .all_slots()
            .into_iter()
            .filter(|slot| !slot.is_locked())
            .collect();
        let mut candidates: Vec<Candidate> = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| Candidate::new(&**slot, index))
            .collect();
        let whole_buckets = {
            let policy = self.policy.read();
            policy.rank(&mut candidates);
            policy.strategy() == Strategy::Recency
        };

        let mut evicted = 0;
        let mut evicted_key: Option<String> = None;
        for candidate in candidates {
            let completes_bucket =
                whole_buckets && evicted_key.as_deref() == Some(candidate.key());
            if self.len() <= target && !completes_bucket {
                break;
            }

            let slot = &slots[candidate.index];
            if slot.try_claim() && self.destroy(slot) {
                evicted += 1;
                if !completes_bucket {
                    evicted_key = Some(candidate.key().to_owned());
                }
            }
        }
        let _ = self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);

        let live = self.len();
        let in_use = self
            .all_slots()
            .iter()
            .filter(|slot| slot.is_locked())
            .count();
        if live > target && in_use > 0 {
            log::warn!(
                "Cache {}: {} handles are still open (target: {}) as {} of them are in use. \
                 Consider raising the limits.",
                self.name,
                live,
                target,
                in_use
            );
        } else {
            log::debug!(
                "Cache {}: Closed {} idle handles, {} remain open.",
                self.name,
                evicted,
                live
            );
        }

        evicted
    }

    /// Closes and removes all handles for the given key, even if they are in use.
    ///
    /// Handles which are still in use are closed right away as well. As they are no longer
    /// connected to this cache, a later close by their holder is a plain close.
    pub fn eject(&self, key: &str) {
        let bucket = match self.buckets.remove(key) {
            Some((_, bucket)) => bucket,
            None => return,
        };

        let slots = {
            let mut state = bucket.lock();
            state.removed = true;
            std::mem::take(&mut state.slots)
        };
        self.policy.read().record_removal(key);

        for slot in slots {
            if slot.is_locked() {
                log::debug!(
                    "Cache {}: Ejecting {} while it is in use...",
                    self.name,
                    slot.handle().location()
                );
            }
            let _ = self.dispose(&slot);
        }
    }

    /// Closes all idle handles.
    ///
    /// If **force** is set, handles which are in use are closed as well (which is logged as
    /// warning, as their holders will most probably fail).
    pub fn clear_cache(&self, force: bool) {
        let mut closed = 0;
        for slot in self.all_slots() {
            if slot.try_claim() {
                if self.destroy(&slot) {
                    closed += 1;
                }
            } else if force {
                log::warn!(
                    "Cache {}: Forcefully closing {} while it is in use...",
                    self.name,
                    slot.handle().location()
                );
                if self.destroy(&slot) {
                    closed += 1;
                }
            }
        }

        if force {
            self.policy.read().clear();
        }

        log::info!(
            "Cache {}: Closed {} handles, {} remain open.",
            self.name,
            closed,
            self.len()
        );
    }

    /// Disables caching.
    ///
    /// All idle handles are closed. From now on, each acquire opens a new handle and each
    /// release closes it.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Release);
        log::info!("Cache {}: Disabling the cache...", self.name);
        self.clear_cache(false);
    }

    /// Re-enables caching after [disable](FileCache::disable) has been called.
    pub fn enable(&self) {
        self.disabled.store(false, Ordering::Release);
        log::info!("Cache {}: Enabling the cache...", self.name);
    }

    /// Applies new settings.
    ///
    /// A changed strategy replaces the eviction policy (which then learns about all present
    /// keys). A changed period reschedules the periodic cleanup. If the new limits are already
    /// exceeded, a cleanup is triggered right away.
    pub fn apply_settings(&self, settings: CacheSettings) {
        let previous = std::mem::replace(&mut *self.settings.lock(), settings);
        if previous == settings {
            return;
        }

        log::info!(
            "Cache {}: Applying new settings ({})",
            self.name,
            settings.describe()
        );

        if previous.strategy != settings.strategy {
            let policy = settings.strategy.create();
            for key in self.keys() {
                policy.record_access(&key);
            }
            *self.policy.write() = policy;
        }

        if previous.limits.period() != settings.limits.period() {
            self.schedule_periodic_cleanup(settings.limits.period());
        }

        self.tracking.set_enabled(settings.tracking);
        self.enforce_limits();
    }

    fn schedule_periodic_cleanup(&self, period: Duration) {
        let mut periodic_cleanup = self.periodic_cleanup.lock();
        if let Some(task) = periodic_cleanup.take() {
            task.cancel();
        }

        let cache = self.me.clone();
        *periodic_cleanup = self.scheduler.schedule_repeating(period, move || {
            if let Some(cache) = cache.upgrade() {
                let _ = cache.cleanup(cache.limits().min_elements());
            }
        });
    }

    fn keys(&self) -> Vec<String> {
        self.buckets.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Collects all slots without holding any shard lock while the buckets are inspected.
    fn all_slots(&self) -> Vec<Arc<Slot<H>>> {
        let buckets: Vec<Arc<Bucket<H>>> = self
            .buckets
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        buckets.iter().flat_map(|bucket| bucket.snapshot()).collect()
    }

    /// Lists all slots, ordered by key.
    pub fn show_cache(&self) -> Vec<SlotSummary> {
        let mut result: Vec<SlotSummary> = self
            .all_slots()
            .iter()
            .filter(|slot| self.handles.contains_key(&slot.id()))
            .map(|slot| slot.summary())
            .collect();
        result.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.idle.cmp(&b.idle)));

        result
    }

    /// Returns the central metrics of this cache.
    pub fn show_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            live: self.len(),
            buckets: self.buckets.len(),
        }
    }

    /// Returns the hits and misses per location, most requested first.
    ///
    /// This is empty unless **tracking** is enabled in the settings.
    pub fn show_tracking(&self) -> Vec<TrackerSummary> {
        self.tracking.summaries()
    }

    /// Discards all hits and misses recorded per location.
    pub fn reset_tracking(&self) {
        self.tracking.reset();
    }

    /// Renders the settings, metrics and contents of this cache as a text report.
    pub fn report(&self) -> String {
        let settings = self.settings();
        let stats = self.show_stats();

        let mut result = String::new();
        result += format!("{:<30} {:>20}\n", "Cache", self.name).as_str();
        result += format!("{:<30} {:>20}\n", "Strategy", self.strategy().to_string()).as_str();
        result += format!(
            "{:<30} {:>20}\n",
            "Min / Soft / Hard",
            format!(
                "{} / {} / {}",
                settings.limits.min_elements(),
                settings.limits.soft_limit(),
                settings.limits.hard_limit()
            )
        )
        .as_str();
        result += format!(
            "{:<30} {:>20}\n",
            "Cleanup Period",
            if settings.limits.period().is_zero() {
                "-".to_owned()
            } else {
                format_duration(settings.limits.period())
            }
        )
        .as_str();
        result += format!("{:<30} {:>20}\n", "Disabled", self.is_disabled()).as_str();
        result += format!("{:<30} {:>20}\n", "Open Handles", stats.live).as_str();
        result += format!("{:<30} {:>20}\n", "Keys", stats.buckets).as_str();
        result += format!("{:<30} {:>20}\n", "Hits", stats.hits).as_str();
        result += format!("{:<30} {:>20}\n", "Misses", stats.misses).as_str();
        result += format!("{:<30} {:>18.2} %\n", "Hit Rate", stats.hit_rate()).as_str();
        result += format!("{:<30} {:>20}\n", "Evictions", stats.evictions).as_str();

        result += "\n";
        result += format!(
            "{:<32} {:>6} {:>8} {:>12} {:>19}\n",
            "Location", "In Use", "Accesses", "Idle", "Modified"
        )
        .as_str();
        result += SEPARATOR;
        for slot in self.show_cache() {
            result += format!(
                "{:<32} {:>6} {:>8} {:>12} {:>19}\n",
                slot.location,
                if slot.locked { "yes" } else { "no" },
                slot.access_count,
                format_duration(slot.idle),
                slot.last_modified
                    .map(|timestamp| {
                        DateTime::<Local>::from(timestamp)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()
                    })
                    .unwrap_or_else(|| "-".to_owned())
            )
            .as_str();
        }
        result += SEPARATOR;

        if self.tracking.is_enabled() {
            result += "\n";
            result += format!("{:<44} {:>16} {:>16}\n", "Location", "Hits", "Misses").as_str();
            result += SEPARATOR;
            for tracker in self.show_tracking() {
                result += format!(
                    "{:<44} {:>16} {:>16}\n",
                    tracker.location, tracker.hits, tracker.misses
                )
                .as_str();
            }
            result += SEPARATOR;
        }

        result
    }
}

impl<H: Handle> Release for FileCache<H> {
    fn release_handle(&self, id: usize) -> bool {
        let slot = match self.handles.get(&id).map(|entry| entry.value().clone()) {
            Some(slot) => slot,
            None => {
                log::warn!(
                    "Cache {}: Ignoring the release of a handle which is not managed by this cache.",
                    self.name
                );
                return false;
            }
        };

        if self.is_disabled() {
            log::debug!(
                "Cache {}: Closing {} as the cache is disabled...",
                self.name,
                slot.handle().location()
            );
            let _ = self.destroy(&slot);
            return true;
        }

        if !slot.is_locked() {
            log::warn!(
                "Cache {}: {} has been released although it is not in use.",
                self.name,
                slot.handle().location()
            );
            return false;
        }

        slot.touch();
        if let Err(error) = slot.handle().suspend() {
            log::warn!(
                "Cache {}: Failed to suspend {}: {}",
                self.name,
                slot.handle().location(),
                error
            );
        }
        slot.unlock();

        true
    }
}

impl<H: Handle> Drop for FileCache<H> {
    fn drop(&mut self) {
        if let Some(task) = self.periodic_cleanup.get_mut().take() {
            task.cancel();
        }
    }
}

/// Provides a type independent view on a cache so that caches for different handle types can
/// be managed together.
pub trait ManagedCache: Send + Sync {
    /// Returns the name of the cache.
    fn name(&self) -> &str;

    /// Returns the current settings of the cache.
    fn settings(&self) -> CacheSettings;

    /// Applies new settings.
    fn apply_settings(&self, settings: CacheSettings);

    /// Returns the central metrics.
    fn show_stats(&self) -> CacheStats;

    /// Renders a text report.
    fn report(&self) -> String;

    /// Closes idle handles until at most **target** remain.
    fn cleanup(&self, target: usize) -> usize;

    /// Closes all idle (or with **force** all) handles.
    fn clear_cache(&self, force: bool);

    /// Disables caching.
    fn disable(&self);

    /// Re-enables caching.
    fn enable(&self);
}

impl<H: Handle> ManagedCache for FileCache<H> {
    fn name(&self) -> &str {
        FileCache::name(self)
    }

    fn settings(&self) -> CacheSettings {
        FileCache::settings(self)
    }

    fn apply_settings(&self, settings: CacheSettings) {
        FileCache::apply_settings(self, settings)
    }

    fn show_stats(&self) -> CacheStats {
        FileCache::show_stats(self)
    }

    fn report(&self) -> String {
        FileCache::report(self)
    }

    fn cleanup(&self, target: usize) -> usize {
        FileCache::cleanup(self, target)
    }

    fn clear_cache(&self, force: bool) {
        FileCache::clear_cache(self, force)
    }

    fn disable(&self) {
        FileCache::disable(self)
    }

    fn enable(&self) {
        FileCache::enable(self)
    }
}
