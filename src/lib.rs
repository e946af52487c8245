//! Arduino Connector Library
//!
//! Opens a single serial channel to an Arduino-class board at 9600 8N1 and
//! exchanges newline-delimited text with it: inbound lines are delivered to a
//! [`LineSink`] from a notification thread, outbound text is written
//! synchronously with [`SerialConnector::send`].
//!
//! # Modules
//!
//! - `connector`: The `SerialConnector`, its builder and line sinks
//! - `port`: Port registry, resolution and the serial port abstraction layer
//! - `config`: Configuration management with TOML support
//! - `error`: Connector error taxonomy
//! - `logging`: Tracing subscriber setup for the command-line tool
//!
//! # Assumptions
//!
//! Exclusive ownership of a port is enforced by the operating system at open
//! time, not by this crate.

pub mod config;
pub mod connector;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use connector::{
    ConnectorBuilder, LineSink, ReaderState, SerialConnector, StdoutSink, DEFAULT_OPEN_TIMEOUT,
    DEFAULT_OWNER_LABEL, DEFAULT_POLL_INTERVAL,
};
pub use error::{ConnectorError, ConnectorResult};
pub use port::{
    resolve, MockPlatform, MockSerialPort, PortConfiguration, PortDescriptor, PortError,
    PortEvent, PortKind, SerialPlatform, SerialPortAdapter, SystemPlatform,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
