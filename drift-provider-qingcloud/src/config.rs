//! Provider configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default delay before the second describe, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Default upper bound for the backoff delay, in milliseconds
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
/// Default total wait budget, in seconds (5 minutes)
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;
/// Upper bound for the backoff delay, in milliseconds (1 hour)
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;
/// Upper bound for the total wait budget, in seconds (24 hours)
pub const MAX_POLL_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Transition polling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_interval_ms: u64,
    /// Factor applied to the delay after each wait; 1.0 keeps it fixed
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }
}

impl PollConfig {
    /// Poll at a fixed interval, rounded up to whole milliseconds
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        let interval_ms =
            u64::try_from(interval.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        Self {
            interval_ms,
            max_interval_ms: interval_ms,
            backoff_multiplier: 1.0,
            max_attempts,
            ..Self::default()
        }
    }

    /// Set the wait budget, rounded up to whole seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay to use after waiting `current`, never above `max_interval`
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(self.max_interval(), |next| next.min(self.max_interval()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_interval_ms < self.interval_ms {
            return Err(ConfigError::Invalid(format!(
                "poll.max_interval_ms ({}) must not be less than poll.interval_ms ({})",
                self.max_interval_ms, self.interval_ms
            )));
        }
        if self.max_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "poll.max_interval_ms must be at most {}, got {}",
                MAX_POLL_INTERVAL_MS, self.max_interval_ms
            )));
        }
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.backoff_multiplier) {
            return Err(ConfigError::Invalid(format!(
                "poll.backoff_multiplier must be between 1.0 and {}, got {}",
                MAX_BACKOFF_MULTIPLIER, self.backoff_multiplier
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "poll.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "poll.timeout_secs must be at most {}, got {}",
                MAX_POLL_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        Ok(())
    }
}

/// Configuration of the QingCloud provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Zone the API client targets (e.g., "pek3")
    pub zone: Option<String>,
    pub poll: PollConfig,
}

impl ProviderConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProviderConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.poll.validate()
    }
}
