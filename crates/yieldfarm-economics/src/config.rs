//! Farm configuration and logging bootstrap
//!
//! ```toml
//! [farm]
//! genesis_time = 1767225600
//! epoch_duration_secs = 604800
//! reward_tokens = 2000000
//! decimals = 18
//! epoch_count = 100
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```
//!
//! Amounts are configured in whole tokens because TOML integers are 64-bit.

use crate::constants::*;
use crate::schedule::RewardSchedule;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yieldfarm_core::{Amount, EpochClock, FarmError};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error(transparent)]
    Farm(#[from] FarmError),

    #[error("Failed to install logger: {0}")]
    Logging(String),
}

/// Complete farm configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Epoch and reward parameters
    #[serde(default)]
    pub farm: FarmSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FarmConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check every parameter the farm is built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.farm.clock()?;
        self.farm.schedule()?;
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => {
                Err(FarmError::InvalidConfig(format!("unknown log format '{}'", other)).into())
            }
        }
    }
}

/// Epoch and reward parameters, fixed at creation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FarmSettings {
    /// Genesis timestamp (Unix seconds)
    #[serde(default)]
    pub genesis_time: i64,

    /// Epoch length in seconds
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration_secs: u64,

    /// Total reward budget in whole tokens
    #[serde(default = "default_reward_tokens")]
    pub reward_tokens: u64,

    /// Decimal places of the reward token
    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Number of rewarded epochs
    #[serde(default = "default_epoch_count")]
    pub epoch_count: u64,
}

fn default_epoch_duration() -> u64 {
    DEFAULT_EPOCH_DURATION_SECS
}

fn default_reward_tokens() -> u64 {
    (DEFAULT_TOTAL_REWARD / ONE_TOKEN) as u64
}

fn default_decimals() -> u8 {
    DECIMALS
}

fn default_epoch_count() -> u64 {
    DEFAULT_EPOCH_COUNT
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            genesis_time: 0,
            epoch_duration_secs: default_epoch_duration(),
            reward_tokens: default_reward_tokens(),
            decimals: default_decimals(),
            epoch_count: default_epoch_count(),
        }
    }
}

impl FarmSettings {
    /// Total reward budget in smallest units
    pub fn total_reward(&self) -> Result<Amount, FarmError> {
        10u128
            .checked_pow(u32::from(self.decimals))
            .and_then(|unit| unit.checked_mul(u128::from(self.reward_tokens)))
            .ok_or(FarmError::ArithmeticOverflow("configured reward budget"))
    }

    pub fn clock(&self) -> Result<EpochClock, FarmError> {
        EpochClock::new(self.genesis_time, self.epoch_duration_secs)
    }

    pub fn schedule(&self) -> Result<RewardSchedule, FarmError> {
        RewardSchedule::new(self.total_reward()?, self.epoch_count)
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text, json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false),
            )
            .try_init()
    };

    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}
