//! Contains the size limits and settings of a cache.
//!
//! # Configuration
//! Settings are read from the **caches** section of the system config:
//!
//! ```yaml
//! caches:
//!     files:
//!         # Periodic and soft limit cleanups trim the cache down to this many handles.
//!         min_elements: 10
//!         # Once more handles are open, a cleanup is scheduled in the background.
//!         soft_limit: 20
//!         # Once more handles are open, the caller which opened the handle performs the
//!         # cleanup itself.
//!         hard_limit: 40
//!         # Runs a cleanup down to min_elements at this interval. Supports common suffixes
//!         # like: ms, s, m, h, d. A plain number is treated as seconds and 0 disables this.
//!         period: 10m
//!         # Either "lru" (default) or "recency".
//!         strategy: lru
//!         # Enables per location hit/miss tracking.
//!         tracking: false
//! ```
use std::time::Duration;

use yaml_rust::Yaml;

use crate::fmt::{format_duration, parse_duration};
use crate::policy::Strategy;

/// Specifies how many handles a cache may keep open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    min_elements: usize,
    soft_limit: usize,
    hard_limit: usize,
    period: Duration,
}

impl Limits {
    /// Creates a new set of limits.
    ///
    /// # Errors
    /// Fails unless **min_elements <= soft_limit <= hard_limit** and **hard_limit > 0**.
    ///
    /// # Examples
    /// ```
    /// # use filecache::limits::Limits;
    /// # use std::time::Duration;
    /// let limits = Limits::new(2, 5, 10, Duration::from_secs(60)).unwrap();
    /// assert_eq!(limits.soft_limit(), 5);
    ///
    /// // The soft limit must not exceed the hard limit...
    /// assert_eq!(Limits::new(2, 20, 10, Duration::ZERO).is_err(), true);
    /// ```
    pub fn new(
        min_elements: usize,
        soft_limit: usize,
        hard_limit: usize,
        period: Duration,
    ) -> anyhow::Result<Self> {
        if hard_limit == 0 {
            return Err(anyhow::anyhow!("The hard_limit must be greater than 0."));
        }
        if min_elements > soft_limit {
            return Err(anyhow::anyhow!(
                "min_elements ({}) must not exceed soft_limit ({}).",
                min_elements,
                soft_limit
            ));
        }
        if soft_limit > hard_limit {
            return Err(anyhow::anyhow!(
                "soft_limit ({}) must not exceed hard_limit ({}).",
                soft_limit,
                hard_limit
            ));
        }

        Ok(Limits {
            min_elements,
            soft_limit,
            hard_limit,
            period,
        })
    }

    /// Returns the number of handles periodic and soft limit cleanups trim the cache down to.
    pub fn min_elements(&self) -> usize {
        self.min_elements
    }

    /// Returns the number of handles which triggers a background cleanup once exceeded.
    pub fn soft_limit(&self) -> usize {
        self.soft_limit
    }

    /// Returns the number of handles which triggers an immediate cleanup once exceeded.
    pub fn hard_limit(&self) -> usize {
        self.hard_limit
    }

    /// Returns the interval of the periodic cleanup (zero if disabled).
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            min_elements: 10,
            soft_limit: 20,
            hard_limit: 40,
            period: Duration::from_secs(10 * 60),
        }
    }
}

/// Combines the limits with the remaining knobs of a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CacheSettings {
    /// Contains the size limits.
    pub limits: Limits,
    /// Contains the eviction strategy to use.
    pub strategy: Strategy,
    /// Determines if hits and misses are tracked per location.
    pub tracking: bool,
}

impl CacheSettings {
    /// Creates settings with the given limits and the default strategy.
    pub fn new(limits: Limits) -> Self {
        CacheSettings {
            limits,
            strategy: Strategy::default(),
            tracking: false,
        }
    }

    /// Specifies the eviction strategy to use.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables per location tracking.
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    /// Reads the settings from the given config object.
    ///
    /// Values which are absent are taken from **defaults**. Invalid values yield an error, as
    /// we'd rather keep the current settings than to apply a partial config.
    ///
    /// # Examples
    /// ```
    /// # use filecache::limits::CacheSettings;
    /// # use filecache::policy::Strategy;
    /// # use std::time::Duration;
    /// # use yaml_rust::YamlLoader;
    /// let docs = YamlLoader::load_from_str("
    /// hard_limit: 100
    /// period: 2m
    /// strategy: recency
    /// ").unwrap();
    ///
    /// let settings = CacheSettings::from_yaml(&docs[0], CacheSettings::default()).unwrap();
    /// assert_eq!(settings.limits.hard_limit(), 100);
    /// assert_eq!(settings.limits.min_elements(), 10);
    /// assert_eq!(settings.limits.period(), Duration::from_secs(120));
    /// assert_eq!(settings.strategy, Strategy::Recency);
    /// ```
    pub fn from_yaml(config: &Yaml, defaults: CacheSettings) -> anyhow::Result<Self> {
        let limits = Limits::new(
            read_count(config, "min_elements", defaults.limits.min_elements)?,
            read_count(config, "soft_limit", defaults.limits.soft_limit)?,
            read_count(config, "hard_limit", defaults.limits.hard_limit)?,
            read_period(config, defaults.limits.period)?,
        )?;

        let strategy = match &config["strategy"] {
            Yaml::BadValue | Yaml::Null => defaults.strategy,
            Yaml::String(name) => name.parse()?,
            other => return Err(anyhow::anyhow!("Invalid strategy: {:?}", other)),
        };

        let tracking = match &config["tracking"] {
            Yaml::BadValue | Yaml::Null => defaults.tracking,
            Yaml::Boolean(flag) => *flag,
            other => return Err(anyhow::anyhow!("Invalid value for 'tracking': {:?}", other)),
        };

        Ok(CacheSettings {
            limits,
            strategy,
            tracking,
        })
    }

    /// Renders the settings for log output.
    pub fn describe(&self) -> String {
        format!(
            "min: {}, soft: {}, hard: {}, period: {}, strategy: {}, tracking: {}",
            self.limits.min_elements,
            self.limits.soft_limit,
            self.limits.hard_limit,
            if self.limits.period.is_zero() {
                "-".to_owned()
            } else {
                format_duration(self.limits.period)
            },
            self.strategy,
            self.tracking
        )
    }
}

fn read_count(config: &Yaml, name: &str, default: usize) -> anyhow::Result<usize> {
    match &config[name] {
        Yaml::BadValue | Yaml::Null => Ok(default),
        Yaml::Integer(value) if *value >= 0 => Ok(*value as usize),
        other => Err(anyhow::anyhow!(
            "Invalid value for '{}': {:?}. Expected a non-negative number.",
            name,
            other
        )),
    }
}

fn read_period(config: &Yaml, default: Duration) -> anyhow::Result<Duration> {
    match &config["period"] {
        Yaml::BadValue | Yaml::Null => Ok(default),
        Yaml::Integer(seconds) if *seconds >= 0 => Ok(Duration::from_secs(*seconds as u64)),
        Yaml::String(value) => parse_duration(value),
        other => Err(anyhow::anyhow!("Invalid value for 'period': {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use crate::limits::{CacheSettings, Limits};
    use crate::policy::Strategy;
    use std::time::Duration;
    use yaml_rust::YamlLoader;

    fn parse(config: &str) -> anyhow::Result<CacheSettings> {
        let docs = YamlLoader::load_from_str(config).unwrap();
        CacheSettings::from_yaml(&docs[0], CacheSettings::default())
    }

    #[test]
    fn limits_are_validated() {
        assert_eq!(Limits::new(0, 0, 1, Duration::ZERO).is_ok(), true);
        assert_eq!(Limits::new(0, 0, 0, Duration::ZERO).is_err(), true);
        assert_eq!(Limits::new(6, 5, 10, Duration::ZERO).is_err(), true);
        assert_eq!(Limits::new(2, 11, 10, Duration::ZERO).is_err(), true);
    }

    #[test]
    fn settings_are_read_from_yaml() {
        let settings = parse(
            "
min_elements: 2
soft_limit: 5
hard_limit: 10
period: 30
tracking: true
",
        )
        .unwrap();

        assert_eq!(
            settings.limits,
            Limits::new(2, 5, 10, Duration::from_secs(30)).unwrap()
        );
        assert_eq!(settings.strategy, Strategy::Lru);
        assert_eq!(settings.tracking, true);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert_eq!(parse("hard_limit: -1").is_err(), true);
        assert_eq!(parse("hard_limit: many").is_err(), true);
        assert_eq!(parse("period: 1.5s").is_err(), true);
        assert_eq!(parse("period: 300000000000000d").is_err(), true);
        assert_eq!(parse("strategy: fifo").is_err(), true);
        assert_eq!(parse("tracking: 1").is_err(), true);

        // Inconsistent limits are rejected as a whole...
        assert_eq!(parse("min_elements: 30").is_err(), true);
    }

    #[test]
    fn settings_are_described() {
        let settings = CacheSettings::new(Limits::new(1, 2, 3, Duration::ZERO).unwrap())
            .with_strategy(Strategy::Recency);
        assert_eq!(
            settings.describe(),
            "min: 1, soft: 2, hard: 3, period: -, strategy: recency, tracking: false"
        );
    }
}
