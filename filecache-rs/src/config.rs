//! Contains the system configuration.
//!
//! Provides access to the system configuration which is loaded from the **config/settings.yml**
//! file. Note that we observe this file for changes and reload it once a change is detected.
//! After each reload, [Platform::reconfigure](crate::platform::Platform::reconfigure) is invoked
//! so that all caches pick up their new limits without restarting the process.
//!
//! Note that the **Config** struct is kind of constant and can be obtained from the **Platform**
//! once and then kept around. However, when using **Config::current()** to obtain the current
//! config snapshot, this should not be stored, as it will not be updated once a new config has
//! been loaded.
//!
//! # Examples
//!
//! ```
//! # use filecache::config::Config;
//! let config = Config::new("somefile.yml");
//! config.load_from_string("
//! caches:
//!     files:
//!         hard_limit: 128
//! ", None).unwrap();
//!
//! let hard_limit = config.current().query("caches.files.hard_limit").as_i64().unwrap_or(40);
//! assert_eq!(hard_limit, 128);
//! ```
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use arc_swap::ArcSwap;
use yaml_rust::{Yaml, YamlLoader};

use crate::platform::Platform;

/// Provides access to the system configuration.
///
/// Most probably a config instance is installed by the [Builder](crate::builder::Builder) and
/// can be obtained via `platform.config()`.
pub struct Config {
    filename: String,
    config: ArcSwap<(Yaml, Option<SystemTime>)>,
}

/// Represents a snapshot of the currently loaded configuration.
///
/// Note that a snapshot should not be stored or kept around for long, as it will not be updated
/// if the underlying config changed.
pub struct Snapshot {
    config: Arc<(Yaml, Option<SystemTime>)>,
}

impl Config {
    /// Creates a new config reading the given file.
    ///
    /// Note that this will not install a change listener. This is only done by the
    /// [install](install) function.
    pub fn new(file: &str) -> Self {
        Config {
            filename: file.to_owned(),
            config: ArcSwap::new(Arc::new((Yaml::Null, None))),
        }
    }

    /// Obtains a snapshot of the currently loaded configuration.
    ///
    /// Note that this is a fairly efficient operation but still provides some overhead. Therefore
    /// this shouldn't be placed in an inner loop.
    pub fn current(&self) -> Snapshot {
        Snapshot {
            config: self.config.load_full(),
        }
    }

    /// Determines the last modified date of the config file on disk.
    ///
    /// As within docker, the file is presented as volume, we check that it is a file, as an
    /// unmounted docker volume is always presented as directory.
    #[cfg(not(test))]
    fn last_modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.filename)
            .ok()
            .filter(|meta| meta.is_file())
            .and_then(|meta| meta.modified().ok())
    }

    /// Forces the config to read the underlying file.
    ///
    /// Note that this is normally called by the framework and should not be invoked manually.
    pub fn load(&self) -> anyhow::Result<()> {
        log::info!("Loading config file {}...", &self.filename);

        if let Ok(metadata) = std::fs::metadata(&self.filename) {
            if !metadata.is_file() {
                log::info!("Config file doesn't exist or is an unmounted docker volume - skipping config load.");
                return Ok(());
            }
        }

        let config_data = std::fs::read_to_string(&self.filename)
            .with_context(|| format!("Cannot load config file {}", &self.filename))?;

        let last_modified = std::fs::metadata(&self.filename)
            .ok()
            .and_then(|metadata| metadata.modified().ok());

        self.load_from_string(config_data.as_str(), last_modified)
    }

    /// Writes the given config data into the config file.
    ///
    /// The data is verified first, therefore an invalid config is never written. Note that the
    /// new config is not loaded by this, the change monitor will pick it up.
    ///
    /// # Example
    ///
    /// ```
    /// # use filecache::config::Config;
    /// let dir = tempfile::tempdir().unwrap();
    /// let file = dir.path().join("settings.yml");
    /// let config = Config::new(file.to_str().unwrap());
    ///
    /// // Write a config file...
    /// assert_eq!(config.store("
    /// caches:
    ///     files:
    ///         hard_limit: 100
    /// ").is_ok(), true);
    ///
    /// // Load it back and verify its contents (in a fully running system, this would
    /// // happen automatically via the config monitor...)
    /// assert_eq!(config.load().is_ok(), true);
    /// assert_eq!(config.current().query("caches.files.hard_limit").as_i64().unwrap(), 100);
    ///
    /// // Writing an invalid config file is prevented...
    /// assert_eq!(config.store("caches: \"test").is_err(), true);
    ///
    /// // Therefore the original config is still present...
    /// assert_eq!(config.load().is_ok(), true);
    /// assert_eq!(config.current().query("caches.files.hard_limit").as_i64().unwrap(), 100);
    /// ```
    pub fn store(&self, config: &str) -> anyhow::Result<()> {
        log::info!(
            "Programmatically updating the config file {}...",
            &self.filename
        );

        if let Err(error) = YamlLoader::load_from_str(config) {
            Err(anyhow::anyhow!("Cannot parse config data: {}", error))
        } else {
            std::fs::write(&self.filename, config).context("Failed to write to config file!")?;
            log::info!("Config has been updated successfully!");

            Ok(())
        }
    }

    /// Loads a configuration from the given string instead of a file.
    ///
    /// This is intended to be used in test environments where we cannot / do not want to load
    /// a config file from disk. If the data cannot be parsed, the current config is kept.
    pub fn load_from_string(
        &self,
        data: &str,
        last_modified: Option<SystemTime>,
    ) -> anyhow::Result<()> {
        let mut docs = YamlLoader::load_from_str(data).map_err(|error| {
            anyhow::anyhow!("Cannot parse config file {}: {}", &self.filename, error)
        })?;

        let doc = match docs.get(0) {
            Some(Yaml::Hash(_)) => docs.swap_remove(0),
            _ => Yaml::Null,
        };

        self.config.store(Arc::new((doc, last_modified)));

        Ok(())
    }
}

impl Snapshot {
    /// Provides access to the root of the currently loaded configuration.
    pub fn config(&self) -> &Yaml {
        &self.config.0
    }

    /// Returns the modification timestamp of the file this config was loaded from.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.config.1
    }

    /// Resolves a dotted path like **caches.files.hard_limit**.
    ///
    /// Returns **Yaml::BadValue** if any part of the path is absent.
    pub fn query(&self, query: impl AsRef<str>) -> &Yaml {
        query
            .as_ref()
            .split('.')
            .filter(|part| !part.is_empty())
            .fold(&self.config.0, |node, part| &node[part])
    }
}

/// Creates and installs a **Config** for the given platform.
///
/// This will read its contents from **settings.yml** and also install a change monitor for this
/// file. Note that this monitor only watches the "last modified" date of the file and will
/// not perform a structural comparison. Therefore each cache has to gracefully handle partial
/// config changes.
///
/// Note that this method is also called by the [Builder](crate::builder::Builder) unless the
/// **Config** part is disabled.
pub fn install(platform: &Arc<Platform>) -> Arc<Config> {
    // Create the "config" directory in case it doesn't exist...
    let path = Path::new("config");
    if let Err(error) = std::fs::create_dir_all(path) {
        log::warn!(
            "Failed to create config base directory {}: {}",
            path.to_string_lossy(),
            error
        )
    }

    // Install a config instance and point it to "settings.yml"..
    let config = Arc::new(Config::new("config/settings.yml"));

    // Actually try to read the file...
    if let Err(error) = config.load() {
        log::error!("{:#}", error);
    }
    platform.install_config(config.clone());

    // Install a change monitor which runs every 2s...
    run_config_change_monitor(platform, config.clone());

    config
}

#[cfg(test)]
fn run_config_change_monitor(_platform: &Arc<Platform>, _config: Arc<Config>) {
    // No automatic updates during testing...
}

#[cfg(not(test))]
fn run_config_change_monitor(platform: &Arc<Platform>, config: Arc<Config>) {
    let weak_platform = Arc::downgrade(platform);
    let task = platform.scheduler().schedule_repeating(
        std::time::Duration::from_secs(2),
        move || {
            let platform = match weak_platform.upgrade() {
                Some(platform) if platform.is_running() => platform,
                _ => return,
            };

            // This will contain the last modified date of the file on disk or be None if the
            // file is absent...
            let last_modified = config.last_modified();

            // Contains the timestamp when the file was loaded the last time or be None if no
            // data has been loaded yet...
            let last_loaded = config.config.load().1;

            // If a file is present and newer that the one previously loaded (or if none has been
            // loaded so far) -> perform a reload and update all caches...
            if last_modified.is_some() && (last_loaded.is_none() || last_modified > last_loaded) {
                match config.load() {
                    Ok(_) => {
                        log::info!("System configuration was re-loaded.");
                        platform.reconfigure();
                    }
                    Err(error) => log::error!("Failed to re-load system config: {:#}", error),
                }
            }
        },
    );

    if task.is_none() {
        log::warn!("Cannot monitor the config file as the scheduler has already been stopped.");
    }
}
