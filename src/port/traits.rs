//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock implementations to be used interchangeably, and the
//! `SerialPlatform` trait that stands for the OS port registry.

use super::error::PortError;
use super::registry::PortDescriptor;
use std::time::Duration;

/// Line settings for a serial port.
///
/// The connector always opens with [`PortConfiguration::default`], which is the
/// 9600 8N1 setting Arduino sketches use out of the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Per-call read/write timeout. Reads that hit it report `TimedOut`,
    /// which the line reader treats as "no data yet".
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(100),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Kinds of notification a serial channel can raise.
///
/// Only `DataAvailable` drives the line reader; the line-status and modem
/// signals are surfaced so they can be observed in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    DataAvailable,
    OutputBufferEmpty,
    Break,
    Overrun,
    ParityError,
    FramingError,
    CarrierDetect,
    RingIndicator,
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until previously written bytes have been handed to the driver.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read; `Ok(0)` means end of stream.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Get the current bytes available to read (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }

    /// Check for a pending notification without blocking.
    fn poll_event(&mut self) -> Result<Option<PortEvent>, PortError> {
        Ok(self
            .bytes_to_read()
            .filter(|n| *n > 0)
            .map(|_| PortEvent::DataAvailable))
    }

    /// Open a second handle onto the same channel.
    ///
    /// The connector gives one handle to the notification thread for reading
    /// and keeps the other for writing.
    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

/// The platform's port registry and opener.
pub trait SerialPlatform: Send + Sync + std::fmt::Debug {
    /// Enumerate the ports currently known to the platform.
    fn ports(&self) -> Result<Vec<PortDescriptor>, PortError>;

    /// Open `descriptor` exclusively with the given line settings.
    ///
    /// `owner` is a diagnostic label for whoever holds the port. `open_timeout`
    /// bounds how long a busy port is waited on.
    fn open(
        &self,
        descriptor: &PortDescriptor,
        owner: &str,
        config: &PortConfiguration,
        open_timeout: Duration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
