//! Configuration management for Starchain

use crate::error::{ChainError, Result};
use crate::logging::LogFormat;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rules for the ownership-verification protocol and genesis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// A message is rejected once this many seconds have elapsed since it was issued.
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,
    /// How far in the future a message timestamp may be before it is refused.
    #[serde(default = "default_clock_skew")]
    pub max_clock_skew_secs: u64,
    #[serde(default = "default_message_suffix")]
    pub message_suffix: String,
    #[serde(default = "default_genesis_data")]
    pub genesis_data: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: default_freshness_window(),
            max_clock_skew_secs: default_clock_skew(),
            message_suffix: default_message_suffix(),
            genesis_data: default_genesis_data(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.freshness_window_secs == 0 {
            return Err(ChainError::ConfigError(
                "registry.freshness_window_secs must be greater than zero".to_string(),
            ));
        }
        if self.message_suffix.is_empty() || self.message_suffix.contains(':') {
            return Err(ChainError::ConfigError(
                "registry.message_suffix must be non-empty and contain no ':'".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_str_lossy(&self.format)
    }
}

/// Load `config.toml` from the working directory, falling back to defaults when absent.
pub fn load_config() -> Result<Config> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)
            .map_err(|e| ChainError::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.registry.validate()?;
    Ok(config)
}

fn default_freshness_window() -> u64 {
    5 * 60
}

fn default_clock_skew() -> u64 {
    30
}

fn default_message_suffix() -> String {
    "starRegistry".to_string()
}

fn default_genesis_data() -> String {
    "Genesis Block".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
