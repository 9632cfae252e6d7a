//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ShiftError, ShiftResult};

/// How selected items are relocated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MoveStrategy {
    /// Delegate to server-side copy jobs, merging into existing folders.
    #[default]
    CopyJob,
    /// Create, move and delete item by item.
    Direct,
}

/// Configuration for move operations.
///
/// Every delay is expressed in milliseconds so the file format stays flat.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ShiftConfig {
    /// Retries allowed per platform call before giving up.
    #[builder(default = "5")]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after a 500-class failure.
    #[builder(default = "100")]
    #[serde(default = "default_transient_delay_ms")]
    pub transient_delay_ms: u64,

    /// Delay after a 429/503 failure.
    #[builder(default = "10_000")]
    #[serde(default = "default_throttled_delay_ms")]
    pub throttled_delay_ms: u64,

    /// Delay after a failure that carried no status.
    #[builder(default = "500")]
    #[serde(default = "default_unknown_delay_ms")]
    pub unknown_delay_ms: u64,

    /// Attempts for one whole copy-job unit (submit and poll).
    #[builder(default = "3")]
    #[serde(default = "default_job_attempts")]
    pub job_attempts: u32,

    /// Pause between copy-job unit attempts.
    #[builder(default = "5_000")]
    #[serde(default = "default_job_retry_delay_ms")]
    pub job_retry_delay_ms: u64,

    /// Quiet period after which the copy-job failure count resets.
    #[builder(default = "18_000")]
    #[serde(default = "default_job_retry_window_ms")]
    pub job_retry_window_ms: u64,

    /// Poll cadence until the job reports that it started.
    #[builder(default = "5_000")]
    #[serde(default = "default_queued_poll_ms")]
    pub queued_poll_ms: u64,

    /// Poll cadence once the job is running.
    #[builder(default = "1_000")]
    #[serde(default = "default_running_poll_ms")]
    pub running_poll_ms: u64,

    /// Upper bound on waiting for one job, in seconds (None = wait forever).
    #[builder(default)]
    #[serde(default)]
    pub max_poll_secs: Option<u64>,

    /// How items are moved.
    #[builder(default)]
    #[serde(default)]
    pub strategy: MoveStrategy,

    /// Where the job registry is kept (None = platform data directory).
    #[builder(default)]
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Site used when none is given on the command line.
    #[builder(default)]
    #[serde(default)]
    pub site_url: Option<String>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_transient_delay_ms() -> u64 {
    100
}

fn default_throttled_delay_ms() -> u64 {
    10_000
}

fn default_unknown_delay_ms() -> u64 {
    500
}

fn default_job_attempts() -> u32 {
    3
}

fn default_job_retry_delay_ms() -> u64 {
    5_000
}

fn default_job_retry_window_ms() -> u64 {
    18_000
}

fn default_queued_poll_ms() -> u64 {
    5_000
}

fn default_running_poll_ms() -> u64 {
    1_000
}

impl ShiftConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.job_attempts == Some(0) {
            return Err("job_attempts must be at least 1".to_string());
        }
        if self.queued_poll_ms == Some(0) || self.running_poll_ms == Some(0) {
            return Err("poll intervals must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            transient_delay_ms: default_transient_delay_ms(),
            throttled_delay_ms: default_throttled_delay_ms(),
            unknown_delay_ms: default_unknown_delay_ms(),
            job_attempts: default_job_attempts(),
            job_retry_delay_ms: default_job_retry_delay_ms(),
            job_retry_window_ms: default_job_retry_window_ms(),
            queued_poll_ms: default_queued_poll_ms(),
            running_poll_ms: default_running_poll_ms(),
            max_poll_secs: None,
            strategy: MoveStrategy::default(),
            data_dir: None,
            site_url: None,
        }
    }
}

impl ShiftConfig {
    /// Create a new config builder.
    pub fn builder() -> ShiftConfigBuilder {
        ShiftConfigBuilder::default()
    }

    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shift")
            .join("config.toml")
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> ShiftResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ShiftError::invalid_config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load the config file at `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> ShiftResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ShiftError::storage(path, e)),
        }
    }

    fn check(&self) -> ShiftResult<()> {
        if self.job_attempts == 0 {
            return Err(ShiftError::invalid_config("job_attempts must be at least 1"));
        }
        if self.queued_poll_ms == 0 || self.running_poll_ms == 0 {
            return Err(ShiftError::invalid_config(
                "poll intervals must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Directory holding persisted job state.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shift")
        })
    }

    pub fn queued_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queued_poll_ms)
    }

    pub fn running_poll_interval(&self) -> Duration {
        Duration::from_millis(self.running_poll_ms)
    }

    pub fn max_poll_duration(&self) -> Option<Duration> {
        self.max_poll_secs.map(Duration::from_secs)
    }
}
