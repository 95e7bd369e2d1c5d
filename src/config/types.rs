//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_client, default_expire_interval, default_log_filter, default_true,
};
use super::validation::ValidationError;
use crate::xline::Capabilities;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// OperServ configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service identity and access.
    #[serde(default)]
    pub operserv: OperServConfig,
    /// What the uplink protocol enforces natively.
    #[serde(default)]
    pub protocol: Capabilities,
    /// X-line behavior.
    #[serde(default)]
    pub xlines: XLineConfig,
    /// Logging output.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        super::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OperServConfig {
    /// Nickname of the OperServ client. Kills and notices come from it.
    #[serde(default = "default_client")]
    pub client: String,
    /// Only IRC operators may talk to the service.
    #[serde(default = "default_true")]
    pub opers_only: bool,
}

impl Default for OperServConfig {
    fn default() -> Self {
        Self {
            client: default_client(),
            opers_only: true,
        }
    }
}

/// X-line behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct XLineConfig {
    /// Compile `/regex/` masks case-insensitively (default: true).
    #[serde(default = "default_true")]
    pub regex_case_insensitive: bool,
    /// Seconds between expiry sweeps (default: 30).
    #[serde(default = "default_expire_interval")]
    pub expire_interval: u64,
}

impl Default for XLineConfig {
    fn default() -> Self {
        Self {
            regex_case_insensitive: true,
            expire_interval: default_expire_interval(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: default_log_filter(),
        }
    }
}
