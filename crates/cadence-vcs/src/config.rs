//! Version-control configuration.
//!
//! Loaded from an optional JSON file, then overridden by `CADENCE_VCS_*`
//! environment variables:
//! - `CADENCE_VCS_DIFF_STOP_TIMEOUT_MS`
//! - `CADENCE_VCS_REMOTE_CACHE_TTL_HOURS`
//! - `CADENCE_VCS_ROOT_MESSAGE`
//! - `CADENCE_VCS_LOG_LEVEL`

use cadence_util::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound for `remote_cache_ttl_hours`, one hundred years.
pub const MAX_REMOTE_CACHE_TTL_HOURS: u64 = 100 * 365 * 24;

/// Version-control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    /// How long to wait for a diff worker to stop before detaching it.
    pub diff_stop_timeout_ms: u64,

    /// Age after which the remote revision cache is considered stale.
    /// At most [`MAX_REMOTE_CACHE_TTL_HOURS`].
    pub remote_cache_ttl_hours: u64,

    /// Message of the root revision of a new history.
    pub root_message: String,

    /// Name given to diff worker threads.
    pub worker_thread_name: String,

    /// Capacity of the notification channel.
    pub event_capacity: usize,

    /// Log level for hosts that let the core configure logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            diff_stop_timeout_ms: 2000,
            remote_cache_ttl_hours: 24,
            root_message: "Project started".to_string(),
            worker_thread_name: "vcs-diff".to_string(),
            event_capacity: crate::bus::DEFAULT_CAPACITY,
            log_level: None,
        }
    }
}

impl VcsConfig {
    /// Load from an optional JSON file and apply environment overrides.
    /// A missing file yields the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(content) => Self::from_json(&content, &path.display().to_string())?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
                Err(source) => {
                    return Err(ConfigError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                }
            },
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a JSON document; `origin` names it in errors.
    pub fn from_json(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        check_ttl("remote_cache_ttl_hours", config.remote_cache_ttl_hours)?;
        Ok(config)
    }

    /// Apply `CADENCE_VCS_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CADENCE_VCS_DIFF_STOP_TIMEOUT_MS") {
            self.diff_stop_timeout_ms = parse_number("CADENCE_VCS_DIFF_STOP_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("CADENCE_VCS_REMOTE_CACHE_TTL_HOURS") {
            let hours = parse_number("CADENCE_VCS_REMOTE_CACHE_TTL_HOURS", &value)?;
            check_ttl("CADENCE_VCS_REMOTE_CACHE_TTL_HOURS", hours)?;
            self.remote_cache_ttl_hours = hours;
        }
        if let Some(value) = lookup("CADENCE_VCS_ROOT_MESSAGE") {
            self.root_message = value;
        }
        if let Some(value) = lookup("CADENCE_VCS_LOG_LEVEL") {
            self.log_level = Some(LogLevel::parse(&value).ok_or_else(|| {
                ConfigError::InvalidValue {
                    name: "CADENCE_VCS_LOG_LEVEL".to_string(),
                    value,
                }
            })?);
        }
        Ok(())
    }

    pub fn diff_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.diff_stop_timeout_ms)
    }

    /// The cache TTL, clamped to [`MAX_REMOTE_CACHE_TTL_HOURS`].
    pub fn remote_cache_ttl(&self) -> chrono::Duration {
        let hours = self.remote_cache_ttl_hours.min(MAX_REMOTE_CACHE_TTL_HOURS);
        chrono::Duration::hours(hours as i64)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn check_ttl(name: &str, hours: u64) -> Result<(), ConfigError> {
    if hours > MAX_REMOTE_CACHE_TTL_HOURS {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: hours.to_string(),
        });
    }
    Ok(())
}
