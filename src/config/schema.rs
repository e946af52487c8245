//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::connector::DEFAULT_OWNER_LABEL;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Upper bound accepted for `serial.open_timeout_ms`.
const MAX_OPEN_TIMEOUT_MS: u64 = 60_000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.open_timeout_ms > MAX_OPEN_TIMEOUT_MS {
            return Err(ConfigError::validation(
                "serial.open_timeout_ms",
                format!("must be at most {}", MAX_OPEN_TIMEOUT_MS),
            ));
        }
        if !(1..=1000).contains(&self.serial.poll_interval_ms) {
            return Err(ConfigError::validation(
                "serial.poll_interval_ms",
                "must be between 1 and 1000",
            ));
        }
        if self.serial.owner_label.trim().is_empty() {
            return Err(ConfigError::validation(
                "serial.owner_label",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Serial port configuration section.
///
/// Line settings are not configurable: the connector always uses 9600 8N1.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port to connect to, or an alias from `port_aliases`
    pub port: Option<String>,
    /// Owner label recorded when the port is opened
    pub owner_label: String,
    /// How long to wait for a busy port, in milliseconds
    pub open_timeout_ms: u64,
    /// Notification polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Device paths to consider; empty means whatever the OS enumerates
    #[serde(default)]
    pub scan_paths: Vec<String>,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            owner_label: DEFAULT_OWNER_LABEL.to_string(),
            open_timeout_ms: 2000,
            poll_interval_ms: 10,
            scan_paths: Vec::new(),
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Get the open timeout as Duration
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Get the poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}
