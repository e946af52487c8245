//! Port-specific error types.
//!
//! Defines error types for serial port operations, separate from connector-level
//! errors to maintain clean separation of concerns.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found in the port registry.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The port stayed busy for the whole open timeout.
    #[error("Timed out after {waited:?} waiting for port {port} to become available")]
    OpenTimeout { port: String, waited: Duration },

    /// The port is held exclusively by another owner.
    #[error("Serial port is busy: {0}")]
    Busy(String),

    /// The driver rejected the line settings.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A received line was not valid text.
    #[error("Invalid UTF-8 in received line: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel was closed underneath the operation.
    #[error("Port is closed")]
    Closed,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create an UnsupportedConfiguration error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(message.into())
    }

    /// Create an OpenTimeout error for a port.
    pub fn open_timeout(port_name: impl Into<String>, waited: Duration) -> Self {
        Self::OpenTimeout {
            port: port_name.into(),
            waited,
        }
    }

    /// True for the "nothing to read yet" conditions a polling read may hit.
    pub fn is_would_block(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}
