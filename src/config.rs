//! Monitor configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ClinicOffset;

pub const ENV_FEED_URL: &str = "HEARTWATCH_FEED_URL";
pub const ENV_STORE_URL: &str = "HEARTWATCH_STORE_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "HEARTWATCH_POLL_INTERVAL_SECS";

/// About a century
pub const MAX_WEEK_WINDOW_DAYS: u32 = 36_500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Settings for the capture engine and its collaborators
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Telemetry snapshot endpoint
    pub feed_url: String,

    /// Record store endpoint. Records are kept under `store_dir` when unset.
    pub store_url: Option<String>,

    pub store_dir: PathBuf,

    pub poll_interval_secs: u64,

    pub request_timeout_secs: u64,

    /// Whole hours east of UTC
    pub clinic_utc_offset_hours: i32,

    pub week_window_days: u32,

    /// Mailbox depth of each capture actor
    pub command_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed_url: "http://localhost:8080/telemetry".to_string(),
            store_url: None,
            store_dir: PathBuf::from("./heartwatch_data"),
            poll_interval_secs: 6,
            request_timeout_secs: 10,
            clinic_utc_offset_hours: -5,
            week_window_days: 7,
            command_buffer: 32,
        }
    }
}

impl MonitorConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HEARTWATCH_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_FEED_URL) {
            self.feed_url = url;
        }
        if let Some(url) = lookup(ENV_STORE_URL) {
            self.store_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_SECS) {
            self.poll_interval_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_POLL_INTERVAL_SECS.to_string(),
                value: raw.clone(),
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_url.is_empty() {
            return Err(invalid("feed_url", &self.feed_url));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", self.poll_interval_secs));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", self.request_timeout_secs));
        }
        if self.week_window_days == 0 || self.week_window_days > MAX_WEEK_WINDOW_DAYS {
            return Err(invalid("week_window_days", self.week_window_days));
        }
        self.clinic_offset()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn week_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.week_window_days as i64)
    }

    pub fn clinic_offset(&self) -> Result<ClinicOffset, ConfigError> {
        ClinicOffset::from_hours(self.clinic_utc_offset_hours)
            .ok_or_else(|| invalid("clinic_utc_offset_hours", self.clinic_utc_offset_hours))
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
