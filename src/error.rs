use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors surfaced by [`SerialConnector`](crate::SerialConnector).
///
/// When a construction failure (see [`is_construction_failure`](Self::is_construction_failure))
/// is returned, no channel is open and no notification thread is running.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Could not find serial port {0}. Is the device plugged in and readable by this user?")]
    PortNotFound(String),

    #[error("Timed out after {waited:?} waiting for serial port {port}")]
    PortOpenTimeout { port: String, waited: Duration },

    #[error("Serial port {0} is in use by another owner")]
    PortBusy(String),

    #[error("Serial port rejected 9600 8N1: {0}")]
    UnsupportedConfiguration(String),

    /// A single inbound line could not be read; the listener keeps running.
    #[error("Failed to read a line: {0}")]
    StreamReadFailure(#[source] PortError),

    #[error("Failed to write to serial port: {0}")]
    StreamWriteFailure(#[source] PortError),

    #[error("Connector is closed")]
    AlreadyClosed,

    #[error("Failed to enumerate serial ports: {0}")]
    Enumeration(#[source] PortError),

    #[error("Failed to set up serial channel: {0}")]
    Channel(#[source] PortError),

    #[error("Failed to start notification thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ConnectorError {
    /// Map an error raised while resolving or opening a port.
    ///
    /// Anything that is not a recognized open failure is treated as an
    /// enumeration/platform failure.
    pub fn from_open(err: PortError) -> Self {
        match err {
            PortError::NotFound(name) => Self::PortNotFound(name),
            PortError::OpenTimeout { port, waited } => Self::PortOpenTimeout { port, waited },
            PortError::Busy(name) => Self::PortBusy(name),
            PortError::UnsupportedConfiguration(msg) => Self::UnsupportedConfiguration(msg),
            other => Self::Enumeration(other),
        }
    }

    /// Map an error raised by a write on the channel.
    pub fn from_write(err: PortError) -> Self {
        match err {
            PortError::Closed => Self::AlreadyClosed,
            other => Self::StreamWriteFailure(other),
        }
    }

    /// Whether this failure happened while building the connector.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Self::PortNotFound(_)
                | Self::PortOpenTimeout { .. }
                | Self::PortBusy(_)
                | Self::UnsupportedConfiguration(_)
                | Self::Enumeration(_)
                | Self::Channel(_)
                | Self::Spawn(_)
        )
    }
}
