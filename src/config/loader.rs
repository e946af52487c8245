//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ARDUINO_CONNECTOR";

/// Config file name looked up in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "arduino-connector.toml";

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name inside the per-user config directory
const APP_DIR_NAME: &str = "arduino-connector";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ARDUINO_CONNECTOR_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ARDUINO_CONNECTOR_CONFIG` environment variable (explicit path)
    /// 2. `./arduino-connector.toml` (current directory)
    /// 3. `~/.config/arduino-connector/config.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\arduino-connector\config.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default per-user config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&name).ok().map(|val| (name, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ARDUINO_CONNECTOR_<SECTION>_<KEY>`
/// For example:
/// - `ARDUINO_CONNECTOR_SERIAL_PORT=/dev/ttyACM0`
/// - `ARDUINO_CONNECTOR_SERIAL_SCAN_PATHS=/dev/ttyACM0,/dev/ttyUSB0`
/// - `ARDUINO_CONNECTOR_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some((_, val)) = env_var("SERIAL_PORT") {
        config.serial.port = Some(val);
    }
    if let Some((_, val)) = env_var("SERIAL_OWNER_LABEL") {
        config.serial.owner_label = val;
    }
    if let Some((name, val)) = env_var("SERIAL_OPEN_TIMEOUT_MS") {
        config.serial.open_timeout_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid timeout"))?;
    }
    if let Some((name, val)) = env_var("SERIAL_POLL_INTERVAL_MS") {
        config.serial.poll_interval_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid poll interval"))?;
    }
    if let Some((_, val)) = env_var("SERIAL_SCAN_PATHS") {
        config.serial.scan_paths = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    // Logging overrides
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((name, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse::<LogFormat>()
            .map_err(|msg| ConfigError::env_parse(name, msg))?;
    }

    Ok(())
}
