//! Configuration module for arduino-connector.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ARDUINO_CONNECTOR_CONFIG` environment variable (explicit path)
//! 2. `./arduino-connector.toml` (current directory)
//! 3. `~/.config/arduino-connector/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\arduino-connector\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `ARDUINO_CONNECTOR_<SECTION>_<KEY>`
//!
//! Examples:
//! - `ARDUINO_CONNECTOR_SERIAL_PORT=/dev/ttyACM0`
//! - `ARDUINO_CONNECTOR_SERIAL_SCAN_PATHS=/dev/ttyACM0,/dev/ttyUSB0`
//! - `ARDUINO_CONNECTOR_LOGGING_FORMAT=json`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "uno"
//! open_timeout_ms = 2000
//! scan_paths = ["/dev/ttyACM0"]   # Raspberry Pi: ACM devices are not always enumerated
//!
//! [serial.port_aliases]
//! uno = "/dev/ttyACM0"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
