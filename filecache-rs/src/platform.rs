//! Provides the lifecycle owner which keeps all caches of a process.
//!
//! The platform holds the [Scheduler](crate::scheduler::Scheduler), the optional
//! [Config](crate::config::Config) and a registry of all caches. Also this keeps the central
//! **is_running** flag which is toggled to *false* once [Platform::terminate](Platform::terminate)
//! is invoked.
//!
//! Caches are most probably created via [Platform::create_cache](Platform::create_cache), which
//! reads the settings from the **caches** section of the config and keeps them up to date once
//! the config changes.
//!
//! # Examples
//!
//! ```
//! # use filecache::platform::Platform;
//! # use filecache::scheduler::Scheduler;
//! # use filecache::file::FileHandle;
//! # use filecache::limits::CacheSettings;
//! let platform = Platform::new(Scheduler::new().unwrap());
//!
//! // Creates and registers a new cache...
//! let cache = platform.create_cache::<FileHandle>("files", CacheSettings::default());
//! assert_eq!(platform.find_cache("files").is_some(), true);
//!
//! // By default the platform is running...
//! assert_eq!(platform.is_running(), true);
//!
//! // Once terminated...
//! platform.terminate();
//!
//! // all caches are emptied and released...
//! assert_eq!(platform.find_cache("files").is_none(), true);
//! assert_eq!(cache.is_empty(), true);
//!
//! // and the platform (as well as its scheduler) is considered halted...
//! assert_eq!(platform.is_running(), false);
//! assert_eq!(platform.scheduler().is_running(), false);
//! ```
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{FileCache, ManagedCache};
use crate::config::Config;
use crate::fmt::SEPARATOR;
use crate::handle::Handle;
use crate::limits::CacheSettings;
use crate::scheduler::Scheduler;

struct Registration {
    cache: Arc<dyn ManagedCache>,
    defaults: CacheSettings,
}

/// Keeps the scheduler, the config and all caches in a single place.
pub struct Platform {
    scheduler: Arc<Scheduler>,
    config: Mutex<Option<Arc<Config>>>,
    caches: Mutex<HashMap<String, Registration>>,
    is_running: AtomicBool,
}

impl Platform {
    /// Creates a new platform instance which uses the given scheduler for all its caches.
    pub fn new(scheduler: Arc<Scheduler>) -> Arc<Self> {
        Arc::new(Platform {
            scheduler,
            config: Mutex::new(None),
            caches: Mutex::new(HashMap::new()),
            is_running: AtomicBool::new(true),
        })
    }

    /// Returns the scheduler shared by all caches.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Installs the config which provides the settings for all caches.
    ///
    /// Note that this is automatically done by the [Builder](crate::builder::Builder) unless the
    /// config is disabled.
    pub fn install_config(&self, config: Arc<Config>) {
        *self.config.lock() = Some(config);
    }

    /// Returns the config if one has been installed.
    pub fn config(&self) -> Option<Arc<Config>> {
        self.config.lock().clone()
    }

    /// Creates and registers a new cache.
    ///
    /// The settings are read from **caches.[name]** in the config. Values absent there (or all
    /// of them, if no config is present) are taken from **defaults**.
    pub fn create_cache<H: Handle>(
        &self,
        name: &str,
        defaults: CacheSettings,
    ) -> Arc<FileCache<H>> {
        let settings = match self.configured_settings(name, defaults) {
            Ok(settings) => settings,
            Err(error) => {
                log::error!(
                    "Invalid settings for cache {}: {:#}. Using the defaults...",
                    name,
                    error
                );
                defaults
            }
        };

        let cache = FileCache::new(name, settings, self.scheduler.clone());
        self.register_cache(cache.clone(), defaults);

        cache
    }

    /// Registers a cache which has been created manually.
    ///
    /// A cache registered with the same name before is replaced.
    pub fn register_cache(&self, cache: Arc<dyn ManagedCache>, defaults: CacheSettings) {
        let name = cache.name().to_owned();
        if self
            .caches
            .lock()
            .insert(name.clone(), Registration { cache, defaults })
            .is_some()
        {
            log::warn!("A cache named {} has been replaced.", name);
        }
    }

    /// Tries to resolve a previously registered cache.
    pub fn find_cache(&self, name: &str) -> Option<Arc<dyn ManagedCache>> {
        self.caches
            .lock()
            .get(name)
            .map(|registration| registration.cache.clone())
    }

    /// Lists all registered caches ordered by name.
    pub fn caches(&self) -> Vec<Arc<dyn ManagedCache>> {
        let mut caches: Vec<Arc<dyn ManagedCache>> = self
            .caches
            .lock()
            .values()
            .map(|registration| registration.cache.clone())
            .collect();
        caches.sort_by(|a, b| a.name().cmp(b.name()));

        caches
    }

    fn configured_settings(
        &self,
        name: &str,
        defaults: CacheSettings,
    ) -> anyhow::Result<CacheSettings> {
        match self.config() {
            Some(config) => {
                let current = config.current();
                CacheSettings::from_yaml(current.query(format!("caches.{}", name)), defaults)
            }
            None => Ok(defaults),
        }
    }

    /// Applies the current config to all registered caches.
    ///
    /// This is invoked by the config monitor once the config file changed. Caches with invalid
    /// settings keep their current ones.
    pub fn reconfigure(&self) {
        let registrations: Vec<(Arc<dyn ManagedCache>, CacheSettings)> = self
            .caches
            .lock()
            .values()
            .map(|registration| (registration.cache.clone(), registration.defaults))
            .collect();

        for (cache, defaults) in registrations {
            match self.configured_settings(cache.name(), defaults) {
                Ok(settings) => cache.apply_settings(settings),
                Err(error) => log::error!(
                    "Invalid settings for cache {}: {:#}. Keeping the current ones...",
                    cache.name(),
                    error
                ),
            }
        }
    }

    /// Renders an overview of all caches.
    pub fn report(&self) -> String {
        let mut result = String::new();

        result += format!(
            "{:<30} {:>12} {:>12} {:>12} {:>8}\n",
            "Name", "Open", "Hits", "Misses", "Rate"
        )
        .as_str();
        result += SEPARATOR;

        for cache in self.caches() {
            let stats = cache.show_stats();
            result += format!(
                "{:<30} {:>12} {:>12} {:>12} {:>6.1} %\n",
                cache.name(),
                stats.live,
                stats.hits,
                stats.misses,
                stats.hit_rate()
            )
            .as_str();
        }
        result += SEPARATOR;

        result
    }

    /// Determines if the platform is still running or if [Platform::terminate](Platform::terminate)
    /// has already been called.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Terminates the platform.
    ///
    /// This closes all idle handles of all caches, releases the caches and stops the scheduler.
    /// It will also toggle the [is_running()](Platform::is_running) flag to **false**. Only the
    /// first invocation has an effect.
    pub fn terminate(&self) {
        if !self.is_running.swap(false, Ordering::AcqRel) {
            log::debug!("The platform has already been terminated.");
            return;
        }

        let registrations: Vec<Registration> = self
            .caches
            .lock()
            .drain()
            .map(|(_, registration)| registration)
            .collect();
        for registration in registrations {
            registration.cache.clear_cache(false);
        }

        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::FileCache;
    use crate::config::Config;
    use crate::limits::{CacheSettings, Limits};
    use crate::platform::Platform;
    use crate::policy::Strategy;
    use crate::scheduler::Scheduler;
    use crate::testing::{MockFactory, MockHandle};
    use std::sync::Arc;
    use std::time::Duration;

    fn platform_with_config(config: &str) -> Arc<Platform> {
        let platform = Platform::new(Scheduler::new().unwrap());
        let settings = Arc::new(Config::new("test.yml"));
        settings.load_from_string(config, None).unwrap();
        platform.install_config(settings);

        platform
    }

    #[test]
    fn caches_are_created_from_the_config() {
        let platform = platform_with_config(
            "
caches:
    files:
        min_elements: 1
        soft_limit: 2
        hard_limit: 3
        strategy: recency
",
        );

        let cache = platform.create_cache::<MockHandle>("files", CacheSettings::default());
        assert_eq!(cache.limits().hard_limit(), 3);
        assert_eq!(cache.strategy(), Strategy::Recency);

        // The period is absent in the config and therefore taken from the defaults...
        assert_eq!(cache.limits().period(), Duration::from_secs(600));

        // Caches without config use their defaults...
        let other = platform.create_cache::<MockHandle>("other", CacheSettings::default());
        assert_eq!(other.settings(), CacheSettings::default());

        assert_eq!(
            platform
                .caches()
                .iter()
                .map(|cache| cache.name().to_owned())
                .collect::<Vec<_>>(),
            vec!["files", "other"]
        );
        assert_eq!(platform.report().contains("files"), true);
    }

    #[test]
    fn invalid_settings_fall_back_to_the_defaults() {
        let platform = platform_with_config(
            "
caches:
    files:
        min_elements: 30
",
        );

        let cache = platform.create_cache::<MockHandle>("files", CacheSettings::default());
        assert_eq!(cache.settings(), CacheSettings::default());
    }

    #[test]
    fn config_changes_are_applied() {
        let platform = platform_with_config("caches: {}");
        let cache = platform.create_cache::<MockHandle>("files", CacheSettings::default());
        let factory = MockFactory::new();

        for key in ["a", "b", "c", "d"] {
            let handle = cache.acquire(&factory, key).unwrap();
            assert_eq!(cache.release(&handle), true);
        }

        let config = platform.config().unwrap();
        config
            .load_from_string(
                "
caches:
    files:
        min_elements: 0
        soft_limit: 1
        hard_limit: 2
",
                None,
            )
            .unwrap();
        platform.reconfigure();
        assert_eq!(cache.limits().hard_limit(), 2);
        assert_eq!(cache.len(), 2);

        // An invalid config is rejected and the current settings are kept...
        config
            .load_from_string("caches:\n    files:\n        hard_limit: -1", None)
            .unwrap();
        platform.reconfigure();
        assert_eq!(cache.limits().hard_limit(), 2);
    }

    #[test]
    fn terminate_happens_once() {
        let platform = Platform::new(Scheduler::new().unwrap());
        let cache: Arc<FileCache<MockHandle>> =
            platform.create_cache("files", CacheSettings::new(Limits::default()));
        let factory = MockFactory::new();

        let idle = cache.acquire(&factory, "a").unwrap();
        assert_eq!(cache.release(&idle), true);
        let in_use = cache.acquire(&factory, "b").unwrap();

        platform.terminate();
        assert_eq!(platform.is_running(), false);
        assert_eq!(platform.scheduler().is_running(), false);
        assert_eq!(platform.caches().is_empty(), true);
        assert_eq!(idle.stats().closes(), 1);
        assert_eq!(in_use.stats().closes(), 0);

        // A second call is ignored...
        platform.terminate();
        assert_eq!(platform.is_running(), false);
    }
}
