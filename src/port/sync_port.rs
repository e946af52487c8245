//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait for dependency injection and testing.

use super::error::PortError;
use super::traits::{PortConfiguration, PortEvent, SerialPortAdapter};
use std::io::{Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Delay between attempts while waiting for a busy port.
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
    /// Diagnostic label of whoever opened the port.
    owner: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// On Unix `serialport` takes the TTY with `TIOCEXCL`, so a second open of
    /// the same device fails with `Busy` until this handle is dropped.
    ///
    /// # Example
    /// ```no_run
    /// use arduino_connector::port::{SyncSerialPort, PortConfiguration};
    ///
    /// let port = SyncSerialPort::open("/dev/ttyACM0", &PortConfiguration::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.timeout)
            .open()
            .map_err(|e| classify_open_error(port_name, e))?;

        Ok(Self {
            port,
            name: port_name.to_string(),
            owner: String::new(),
        })
    }

    /// Open a port, waiting up to `open_timeout` while another owner holds it.
    ///
    /// A zero timeout fails with `Busy` on the first refusal; otherwise a port
    /// that stays busy past the deadline fails with `OpenTimeout`.
    pub fn open_exclusive(
        port_name: &str,
        owner: &str,
        config: &PortConfiguration,
        open_timeout: Duration,
    ) -> Result<Self, PortError> {
        let mut port = retry_while_busy(port_name, open_timeout, || Self::open(port_name, config))?;
        port.owner = owner.to_string();
        info!(
            port = port_name,
            owner,
            baud = config.baud_rate,
            "Opened serial port"
        );
        Ok(port)
    }
}

/// Repeat `attempt` every 50 ms while it fails with `Busy`.
///
/// Gives up with `OpenTimeout` once `open_timeout` has elapsed. A zero
/// timeout returns the first `Busy` as is.
pub(crate) fn retry_while_busy<T>(
    port_name: &str,
    open_timeout: Duration,
    mut attempt: impl FnMut() -> Result<T, PortError>,
) -> Result<T, PortError> {
    let started = Instant::now();

    loop {
        match attempt() {
            Err(PortError::Busy(name)) => {
                if open_timeout.is_zero() {
                    return Err(PortError::Busy(name));
                }
                let waited = started.elapsed();
                if waited >= open_timeout {
                    return Err(PortError::open_timeout(name, waited));
                }
                debug!(port = port_name, ?waited, "Port busy, waiting");
                thread::sleep(OPEN_RETRY_INTERVAL.min(open_timeout - waited));
            }
            other => return other,
        }
    }
}

/// Map an open failure from `serialport` onto `PortError`.
///
/// On Unix `serialport` reports a TTY held by someone else (`EBUSY` from
/// `TIOCEXCL`, a refused `flock`) as `NoDevice`, the same kind it uses for a
/// missing device.
fn classify_open_error(port_name: &str, err: serialport::Error) -> PortError {
    use serialport::ErrorKind;

    match err.kind() {
        ErrorKind::NoDevice | ErrorKind::Io(_) if is_busy(port_name, &err) => {
            PortError::Busy(port_name.to_string())
        }
        ErrorKind::NoDevice | ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            PortError::not_found(port_name)
        }
        ErrorKind::InvalidInput => PortError::unsupported(err.to_string()),
        _ => PortError::Serial(err),
    }
}

const BUSY_HINTS: [&str; 6] = [
    "busy",
    "in use",
    "lock",
    "access is denied",
    "temporarily unavailable",
    "would block",
];

/// Whether an open failure means another owner holds the device.
fn is_busy(port_name: &str, err: &serialport::Error) -> bool {
    let desc = err.description.to_lowercase();
    if BUSY_HINTS.iter().any(|hint| desc.contains(hint)) {
        return true;
    }

    // An unexplained NoDevice for a node that still exists is a held port.
    cfg!(unix)
        && matches!(err.kind(), serialport::ErrorKind::NoDevice)
        && !desc.contains("no such")
        && !desc.contains("inappropriate ioctl")
        && Path::new(port_name).exists()
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port.flush().map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }

    fn poll_event(&mut self) -> Result<Option<PortEvent>, PortError> {
        let pending = self.port.bytes_to_read()?;
        Ok((pending > 0).then_some(PortEvent::DataAvailable))
    }

    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = self.port.try_clone()?;
        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
            owner: self.owner.clone(),
        }))
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}
