//! Filecache is a library which keeps expensive resource handles open for reuse.
//!
//! # Introduction
//! Opening a scientific data file (think of a NetCDF or HDF5 file on a shared disk) is expensive:
//! the file has to be located, opened and most of the time its header and index structures have
//! to be parsed before the first byte of payload can be read. Applications which serve many
//! requests against a comparatively small set of such files therefore spend most of their time
//! opening and closing the same files over and over again.
//!
//! **Filecache** keeps these handles open after the caller is done with them. The next request
//! for the same location is then served by the already open handle, as long as the file didn't
//! change on disk in the meantime.
//!
//! # Features
//! * **Lock-light concurrency**: Handing out a cached handle is a single compare-and-swap on the
//!   lock bit of its slot. Several copies of the same file can be open at the same time, each
//!   being used by at most one caller.
//! * **Bounded size**: Each cache has a soft and a hard limit. Exceeding the soft limit schedules
//!   a cleanup in the background, exceeding the hard limit makes the caller clean up itself. A
//!   periodic cleanup trims idle handles down to a minimal number. Handles which are in use are
//!   never closed by a cleanup.
//! * **Pluggable eviction**: Either plain LRU over all idle handles or a recency based strategy
//!   which evicts whole keys (see [policy]).
//! * **Staleness detection**: Each handle reports the modification timestamp of its resource.
//!   If this changes, the cached handle is discarded and a fresh one is opened.
//! * **Reload-aware config facility** which permits to change the limits of all caches during
//!   operation (see [config]).
//! * **Diagnostics**: Each cache can report its contents, statistics and (if enabled) hits and
//!   misses per location.
//!
//! # Modules
//! * [cache]: The cache itself. Start here.
//! * [handle]: The contracts a resource has to fulfill in order to be cached.
//! * [file]: A ready to use handle for plain files.
//! * [scheduler]: The background task runner shared by all caches.
//! * [platform]: Keeps all caches of a process and shuts them down in an orderly fashion.
//!
//! # Examples
//! A complete example of using Filecache can be found in **filecache-io**. A short example on
//! how to initialize the library can be found here [Builder](builder::Builder).
#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![warn(unused_results)]
use simplelog::{format_description, ConfigBuilder, LevelFilter, SimpleLogger};
use std::sync::Once;

pub mod builder;
pub mod cache;
pub mod config;
pub mod file;
pub mod fmt;
pub mod handle;
pub mod limits;
pub mod platform;
pub mod policy;
pub mod scheduler;
pub mod signals;
pub mod slot;
pub mod stats;

/// Contains the version of the Filecache library.
pub const FILECACHE_VERSION: &str = "DEVELOPMENT-SNAPSHOT";

/// Contains the git commit hash of the Filecache build being used.
pub const FILECACHE_REVISION: &str = "NO-REVISION";

/// Initializes the logging system.
///
/// Note that most probably the simplest way is to use a [Builder](builder::Builder) to set up the
/// framework, which will also set up logging if enabled.
pub fn init_logging() {
    static INIT_LOGGING: Once = Once::new();

    // We need to do this as otherwise the tests might crash as the logging system
    // is initialized several times...
    INIT_LOGGING.call_once(|| {
        if let Err(error) = SimpleLogger::init(
            LevelFilter::Debug,
            ConfigBuilder::new()
                .set_time_format_custom(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
                ))
                .set_thread_level(LevelFilter::Trace)
                .set_target_level(LevelFilter::Error)
                .set_location_level(LevelFilter::Trace)
                .build(),
        ) {
            panic!("Failed to initialize logging system: {}", error);
        }
    });
}

#[cfg(test)]
mod testing {
    use crate::handle::{Factory, Handle, OpenRequest, Owner};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::SystemTime;

    /// Counts what happened to a mock handle.
    #[derive(Default)]
    pub struct MockStats {
        pub closes: AtomicUsize,
        pub suspends: AtomicUsize,
        pub resumes: AtomicUsize,
        pub fail_resume: AtomicBool,
        pub fail_close: AtomicBool,
    }

    impl MockStats {
        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn suspends(&self) -> usize {
            self.suspends.load(Ordering::SeqCst)
        }

        pub fn resumes(&self) -> usize {
            self.resumes.load(Ordering::SeqCst)
        }
    }

    /// Provides a handle which records all calls made by the cache.
    pub struct MockHandle {
        location: String,
        last_modified: Mutex<Option<SystemTime>>,
        owner: Mutex<Option<Owner>>,
        stats: Arc<MockStats>,
    }

    impl MockHandle {
        pub fn new(location: &str) -> Self {
            MockHandle {
                location: location.to_owned(),
                last_modified: Mutex::new(None),
                owner: Mutex::new(None),
                stats: Arc::new(MockStats::default()),
            }
        }

        pub fn set_last_modified(&self, last_modified: Option<SystemTime>) {
            *self.last_modified.lock() = last_modified;
        }

        pub fn stats(&self) -> &Arc<MockStats> {
            &self.stats
        }

        pub fn has_owner(&self) -> bool {
            self.owner.lock().is_some()
        }
    }

    impl Handle for MockHandle {
        fn location(&self) -> &str {
            &self.location
        }

        fn last_modified(&self) -> Option<SystemTime> {
            *self.last_modified.lock()
        }

        fn close(&self) -> anyhow::Result<()> {
            let owner = self.owner.lock().clone();
            if let Some(owner) = owner {
                if owner.release() {
                    return Ok(());
                }
            }

            let _ = self.stats.closes.fetch_add(1, Ordering::SeqCst);
            if self.stats.fail_close.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("Cannot close {}", self.location));
            }

            Ok(())
        }

        fn suspend(&self) -> anyhow::Result<()> {
            let _ = self.stats.suspends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn resume(&self) -> anyhow::Result<()> {
            if self.stats.fail_resume.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("Cannot resume {}", self.location));
            }

            let _ = self.stats.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_owner(&self, owner: Option<Owner>) {
            *self.owner.lock() = owner;
        }
    }

    /// Opens mock handles and remembers each of them.
    #[derive(Default)]
    pub struct MockFactory {
        opened: Mutex<Vec<Arc<MockStats>>>,
        failing: Mutex<HashSet<String>>,
        last_modified: Mutex<Option<SystemTime>>,
    }

    impl MockFactory {
        pub fn new() -> Self {
            MockFactory::default()
        }

        /// Makes all new handles report the given modification timestamp.
        pub fn with_last_modified(self, last_modified: SystemTime) -> Self {
            *self.last_modified.lock() = Some(last_modified);
            self
        }

        /// Makes all attempts to open the given location fail.
        pub fn fail_on(&self, location: &str) {
            let _ = self.failing.lock().insert(location.to_owned());
        }

        pub fn opens(&self) -> usize {
            self.opened.lock().len()
        }

        pub fn opened(&self) -> Vec<Arc<MockStats>> {
            self.opened.lock().clone()
        }

        /// Returns the number of handles which have been closed more than once.
        pub fn double_closes(&self) -> usize {
            self.opened
                .lock()
                .iter()
                .filter(|stats| stats.closes() > 1)
                .count()
        }

        /// Returns the number of handles which have been closed.
        pub fn closed(&self) -> usize {
            self.opened
                .lock()
                .iter()
                .filter(|stats| stats.closes() > 0)
                .count()
        }
    }

    impl Factory<MockHandle> for MockFactory {
        fn open(&self, request: &OpenRequest) -> anyhow::Result<MockHandle> {
            if self.failing.lock().contains(request.location()) {
                return Err(anyhow::anyhow!("{} is not available", request.location()));
            }

            let handle = MockHandle::new(request.location());
            handle.set_last_modified(*self.last_modified.lock());
            self.opened.lock().push(handle.stats().clone());

            Ok(handle)
        }
    }
}
