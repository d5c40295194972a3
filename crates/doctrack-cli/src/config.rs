//! # Configuration
//!
//! [`DoctrackConfig`] is read from an optional YAML file and then
//! overridden from the environment:
//!
//! | Variable                     | Field                  |
//! |------------------------------|------------------------|
//! | `DOCTRACK_DATA`              | `data_path`            |
//! | `DOCTRACK_DEFAULT_RECIPIENT` | `default_recipient`    |
//! | `DOCTRACK_SWEEP_HOUR`        | `sweep.hour_utc`       |
//! | `DOCTRACK_METRICS_ADDR`      | `metrics.listen`       |
//! | `DOCTRACK_LOG_JSON`          | `log.json`             |
//!
//! Missing fields take their defaults; unknown fields are rejected.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use doctrack_engine::RecipientPolicy;

/// Default dataset location.
pub const DEFAULT_DATA_PATH: &str = "doctrack-data.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoctrackConfig {
    /// Dataset file the CLI reads and writes.
    pub data_path: PathBuf,
    /// Fallback notification recipient.
    pub default_recipient: Option<String>,
    /// Daily sweep settings.
    pub sweep: SweepConfig,
    /// Log output settings.
    pub log: LogConfig,
    /// Metrics exporter settings.
    pub metrics: MetricsConfig,
}

impl Default for DoctrackConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            default_recipient: None,
            sweep: SweepConfig::default(),
            log: LogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Daily sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Hour (UTC) at or after which the daily sweep runs.
    pub hour_utc: u32,
    /// How often the daemon checks whether the sweep is due.
    pub poll_interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            hour_utc: 0,
            poll_interval_secs: 60,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address for the Prometheus scrape endpoint; disabled when unset.
    pub listen: Option<SocketAddr>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid YAML for this schema.
    #[error("invalid config: {0}")]
    Parse(String),
    /// An environment override or field has an unusable value.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Variable or field name.
        name: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl DoctrackConfig {
    /// Load from `path` (if given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from `lookup` (normally the process environment),
    /// then check the result.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DOCTRACK_DATA") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(recipient) = lookup("DOCTRACK_DEFAULT_RECIPIENT") {
            self.default_recipient = Some(recipient);
        }
        if let Some(raw) = lookup("DOCTRACK_SWEEP_HOUR") {
            self.sweep.hour_utc = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "DOCTRACK_SWEEP_HOUR".into(),
                value: raw.clone(),
                reason: "expected an hour between 0 and 23".into(),
            })?;
        }
        if let Some(raw) = lookup("DOCTRACK_METRICS_ADDR") {
            let addr = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "DOCTRACK_METRICS_ADDR".into(),
                value: raw.clone(),
                reason: "expected host:port".into(),
            })?;
            self.metrics.listen = Some(addr);
        }
        if let Some(raw) = lookup("DOCTRACK_LOG_JSON") {
            self.log.json = matches!(raw.trim(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep.hour_utc > 23 {
            return Err(ConfigError::InvalidValue {
                name: "sweep.hour_utc".into(),
                value: self.sweep.hour_utc.to_string(),
                reason: "expected an hour between 0 and 23".into(),
            });
        }
        if self.sweep.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "sweep.poll_interval_secs".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Recipient fallbacks for the sweep.
    pub fn recipient_policy(&self) -> RecipientPolicy {
        RecipientPolicy {
            default_recipient: self.default_recipient.clone(),
        }
    }
}
