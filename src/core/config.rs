//! Configuration management for logz observers.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Lazy resolution of unset fields to defaults
//! - Validation

use crate::core::{LogzError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default limit of distinct message keys per observer.
pub const DEFAULT_MAX_CARDINALITY: u32 = 100;
/// Default number of retained samples per message key.
pub const DEFAULT_MAX_SAMPLES: u32 = 10;
/// Default sampling interval.
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(1);
/// Default maximum number of histogram buckets.
pub const DEFAULT_DIST_RESOLUTION: usize = 100;
/// Upper bound of `max_samples`, every key preallocates its sample slots.
pub const MAX_SAMPLES_LIMIT: u32 = 10_000;
/// Upper bound of `dist_resolution`.
pub const MAX_DIST_RESOLUTION: usize = 10_000;
/// Default histogram bucket retention (one week).
pub const DEFAULT_DIST_RETENTION: Duration = Duration::from_secs(168 * 3600);

/// Observer configuration.
///
/// Every field is optional, `None` resolves to the default at first use.
/// Explicit zero values are honored: `max_samples: Some(0)` keeps counting
/// without retaining samples, `dist_resolution: Some(0)` disables the
/// histogram and `max_cardinality: Some(0)` folds every key into "other".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifies the observer in a group, for example a log level.
    pub name: String,
    /// Limits the number of distinct message keys tracked, default 100.
    pub max_cardinality: Option<u32>,
    /// Number of latest samples kept per message key, default 10.
    pub max_samples: Option<u32>,
    /// Minimum time between two sample collections once a key's samples
    /// are full, also the timestamp granularity. Default 1ms.
    #[serde(with = "humantime_serde")]
    pub sampling_interval: Option<Duration>,
    /// Maximum number of time buckets per message key, default 100.
    pub dist_resolution: Option<usize>,
    /// Maximum age of a histogram bucket, default 168h.
    pub dist_retention_period: Option<Retention>,
    /// Masks dynamic parts of messages (numbers, identifiers) before
    /// admission to reduce cardinality. Costs CPU on every call.
    pub filter_message: bool,
}

/// Histogram bucket retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Buckets older than the period are pruned.
    Limited(Duration),
    /// Buckets are never pruned.
    Unlimited,
}

const UNLIMITED: &str = "unlimited";

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retention::Limited(period) => write!(f, "{}", humantime::format_duration(*period)),
            Retention::Unlimited => f.write_str(UNLIMITED),
        }
    }
}

impl std::str::FromStr for Retention {
    type Err = LogzError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(UNLIMITED) {
            return Ok(Retention::Unlimited);
        }

        humantime::parse_duration(s)
            .map(Retention::Limited)
            .map_err(|e| LogzError::config(format!("Invalid retention period '{}': {}", s, e)))
    }
}

impl Serialize for Retention {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Retention {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Fully resolved, immutable observer settings.
///
/// Time values are expressed in quantized units (multiples of the
/// sampling interval).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Observer name.
    pub name: String,
    /// Sampling interval in nanoseconds, never zero.
    pub sampling_interval: i64,
    /// Maximum number of admitted keys.
    pub max_cardinality: u32,
    /// Sample ring capacity.
    pub max_samples: u32,
    /// Histogram bucket limit, zero when disabled.
    pub dist_resolution: usize,
    /// Retention in quantized units, `None` when unlimited.
    pub dist_retention: Option<i64>,
    /// Whether keys are normalized before admission.
    pub filter_message: bool,
}

impl Settings {
    /// Quantizes a nanosecond timestamp.
    pub fn quantize(&self, unix_nanos: i64) -> i64 {
        unix_nanos / self.sampling_interval
    }

    /// Converts a quantized value back to nanoseconds.
    pub fn unquantize(&self, quantized: i64) -> i64 {
        quantized.saturating_mul(self.sampling_interval)
    }
}

impl Config {
    /// Create a config with the given observer name and defaults
    pub fn named<S: Into<String>>(name: S) -> Self {
        Config {
            name: name.into(),
            ..Config::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        ConfigBuilder::new().from_yaml(&content)?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval == Some(Duration::ZERO) {
            return Err(LogzError::config("sampling_interval must be greater than 0"));
        }

        if self.dist_retention_period == Some(Retention::Limited(Duration::ZERO)) {
            return Err(LogzError::config(
                "dist_retention_period must be greater than 0, use \"unlimited\" to disable pruning",
            ));
        }

        if let Some(max) = self.max_samples.filter(|&m| m > MAX_SAMPLES_LIMIT) {
            return Err(LogzError::config(format!(
                "max_samples must be at most {}, got {}",
                MAX_SAMPLES_LIMIT, max
            )));
        }

        if let Some(res) = self.dist_resolution.filter(|&r| r > MAX_DIST_RESOLUTION) {
            return Err(LogzError::config(format!(
                "dist_resolution must be at most {}, got {}",
                MAX_DIST_RESOLUTION, res
            )));
        }

        Ok(())
    }

    /// Resolve unset fields to defaults. Limits out of range are clamped,
    /// so an unvalidated config never fails at first use.
    pub fn resolve(&self) -> Settings {
        let interval = self
            .sampling_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_SAMPLING_INTERVAL);
        let sampling_interval = i64::try_from(interval.as_nanos()).unwrap_or(i64::MAX);

        let dist_retention = match self
            .dist_retention_period
            .unwrap_or(Retention::Limited(DEFAULT_DIST_RETENTION))
        {
            Retention::Limited(period) => {
                let nanos = i64::try_from(period.as_nanos()).unwrap_or(i64::MAX);
                Some((nanos / sampling_interval).max(1))
            },
            Retention::Unlimited => None,
        };

        Settings {
            name: self.name.clone(),
            sampling_interval,
            max_cardinality: self.max_cardinality.unwrap_or(DEFAULT_MAX_CARDINALITY),
            max_samples: self
                .max_samples
                .unwrap_or(DEFAULT_MAX_SAMPLES)
                .min(MAX_SAMPLES_LIMIT),
            dist_resolution: self
                .dist_resolution
                .unwrap_or(DEFAULT_DIST_RESOLUTION)
                .min(MAX_DIST_RESOLUTION),
            dist_retention,
            filter_message: self.filter_message,
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder::default()
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| LogzError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set observer name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set max cardinality
    pub fn max_cardinality(mut self, max: u32) -> Self {
        self.config.max_cardinality = Some(max);
        self
    }

    /// Set max samples
    pub fn max_samples(mut self, max: u32) -> Self {
        self.config.max_samples = Some(max);
        self
    }

    /// Set sampling interval
    pub fn sampling_interval(mut self, interval: Duration) -> Self {
        self.config.sampling_interval = Some(interval);
        self
    }

    /// Set histogram resolution, zero disables the histogram
    pub fn dist_resolution(mut self, buckets: usize) -> Self {
        self.config.dist_resolution = Some(buckets);
        self
    }

    /// Set histogram retention
    pub fn dist_retention_period(mut self, retention: Retention) -> Self {
        self.config.dist_retention_period = Some(retention);
        self
    }

    /// Enable message filtering
    pub fn filter_message(mut self, enable: bool) -> Self {
        self.config.filter_message = enable;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
