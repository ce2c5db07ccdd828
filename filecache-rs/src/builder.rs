//! Provides a builder which can be used to setup and initialize the framework.
//!
//! This can be used to create and setup central parts of the framework. As Filecache provides
//! some optional parts, a builder permits to selectively enable or disable them.
//!
//! # Example
//! Setting up the framework with all features enabled:
//! ```no_run
//! # use filecache::builder::Builder;
//! # use filecache::file::FileHandle;
//! # use filecache::limits::CacheSettings;
//! // Enable all features and build the platform...
//! let platform = Builder::new().enable_all().build().unwrap();
//!
//! // Create the caches to use...
//! let files = platform.create_cache::<FileHandle>("files", CacheSettings::default());
//!
//! // Run until CTRL-C or SIGHUP is received...
//! while platform.is_running() {
//!     std::thread::sleep(std::time::Duration::from_millis(500));
//! }
//! ```
use std::sync::Arc;

use crate::platform::Platform;
use crate::scheduler::Scheduler;
use crate::{init_logging, FILECACHE_REVISION, FILECACHE_VERSION};

/// Initializes the framework by creating and initializing all core components.
///
/// As Filecache provides a bunch of components of which some are optional, the actual setup
/// can be configured here.
#[derive(Default)]
pub struct Builder {
    setup_logging: bool,
    enable_signals: bool,
    setup_config: bool,
}

impl Builder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Builder {
            setup_logging: false,
            enable_signals: false,
            setup_config: false,
        }
    }

    /// Enables all features.
    ///
    /// Note that using this method (and then maybe disabling selected components) is quite
    /// convenient, but be aware that new components which might be added in a library update
    /// will then also be enabled by default. This might or might not be the expected behaviour.
    pub fn enable_all(mut self) -> Self {
        self.setup_logging = true;
        self.enable_signals = true;
        self.setup_config = true;

        self
    }

    /// Enables the automatic setup of the logging system.
    ///
    /// Using this, we properly initialize **simplelog** to log to stdout. The date format being
    /// used is digestible by established tools like **greylog**.
    pub fn enable_logging(mut self) -> Self {
        self.setup_logging = true;
        self
    }

    /// Disables the automatic setup of the logging system after [enable_all()](Builder::enable_all)
    /// has been used.
    pub fn disable_logging(mut self) -> Self {
        self.setup_logging = false;
        self
    }

    /// Installs a signal listener which terminates the framework once **CTRL-C** or **SIGHUP**
    /// is received.
    ///
    /// For more details see: [signals](crate::signals)
    pub fn enable_signals(mut self) -> Self {
        self.enable_signals = true;
        self
    }

    /// Disables installing the signal listener after [enable_all()](Builder::enable_all)
    /// has been used.
    pub fn disable_signals(mut self) -> Self {
        self.enable_signals = false;
        self
    }

    /// Installs [config::Config](crate::config::Config) and loads the **settings.yml**.
    ///
    /// For more details see: [config](crate::config)
    pub fn enable_config(mut self) -> Self {
        self.setup_config = true;
        self
    }

    /// Disables setting up a **Config** instance after [enable_all()](Builder::enable_all)
    /// has been used.
    pub fn disable_config(mut self) -> Self {
        self.setup_config = false;
        self
    }

    /// Builds the [Platform](crate::platform::Platform) along with its scheduler and all the
    /// enabled components.
    ///
    /// # Errors
    /// Fails if the scheduler cannot be started.
    pub fn build(self) -> anyhow::Result<Arc<Platform>> {
        if self.setup_logging {
            init_logging();
        }

        log::info!(
            "||. FILECACHE (v {} - rev {}) running on {} core(s) in {} CPU(s)",
            FILECACHE_VERSION,
            FILECACHE_REVISION,
            num_cpus::get(),
            num_cpus::get_physical()
        );

        let platform = Platform::new(Scheduler::new()?);

        if self.enable_signals {
            crate::signals::install(&platform);
        }

        if self.setup_config {
            let _ = crate::config::install(&platform);
        }

        Ok(platform)
    }
}
