//! Mock serial port and platform for testing.
//!
//! Provides a `MockSerialPort` that simulates a device without requiring
//! actual hardware, and a `MockPlatform` registry that hands out handles onto
//! those simulated devices. Supports configurable read queues, loopback echo,
//! injected failures and injected notifications.

use super::error::PortError;
use super::registry::{PortDescriptor, PortKind};
use super::sync_port::retry_while_busy;
use super::traits::{PortConfiguration, PortEvent, SerialPlatform, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Inner state of a simulated device, shared by every handle onto it.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Notifications to report before any data-available event.
    pending_events: VecDeque<PortEvent>,
    /// Echo every write back into the read queue.
    loopback: bool,
    /// Report end of stream once the read queue is drained.
    hung_up: bool,
    /// Error kind returned by the next write.
    fail_next_write: Option<std::io::ErrorKind>,
    /// Error kind returned by the next read.
    fail_next_read: Option<std::io::ErrorKind>,
    /// Number of live handles (opened or cloned, not yet dropped).
    open_handles: usize,
}

/// Keeps `open_handles` accurate for handles given out by the platform.
#[derive(Debug)]
struct HandleGuard(Arc<Mutex<MockPortState>>);

impl HandleGuard {
    fn acquire(state: &Arc<Mutex<MockPortState>>) -> Self {
        state.lock().open_handles += 1;
        Self(Arc::clone(state))
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

/// Mock serial port implementation for testing.
///
/// A `MockSerialPort` created with [`MockSerialPort::new`] or obtained via
/// `clone()` is an *observer*: it sees the same device state but does not count
/// as an open handle. Handles returned by [`MockPlatform::open`] do count, and
/// release themselves on drop.
///
/// # Example
/// ```
/// use arduino_connector::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
///
/// // Enqueue data to be read
/// port.enqueue_read(b"Hello, World!");
///
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"Response".to_vec()]);
/// ```
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The device state, shared with every other handle onto this device.
    state: Arc<Mutex<MockPortState>>,
    /// Present only on handles that count as open.
    guard: Option<HandleGuard>,
}

impl MockSerialPort {
    /// Create a new simulated device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
            guard: None,
        }
    }

    /// A counted handle onto the same device.
    fn open_handle(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            guard: Some(HandleGuard::acquire(&self.state)),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Queue a notification ahead of any data-available event.
    pub fn push_event(&self, event: PortEvent) {
        self.state.lock().pending_events.push_back(event);
    }

    /// Echo writes back into the read queue, like a TX-RX jumper.
    pub fn set_loopback(&self, enabled: bool) {
        self.state.lock().loopback = enabled;
    }

    /// Report end of stream once queued data has been read.
    pub fn hang_up(&self) {
        self.state.lock().hung_up = true;
    }

    /// Make the next write fail with the given error kind.
    pub fn fail_next_write(&self, kind: std::io::ErrorKind) {
        self.state.lock().fail_next_write = Some(kind);
    }

    /// Make the next read fail with the given error kind.
    pub fn fail_next_read(&self, kind: std::io::ErrorKind) {
        self.state.lock().fail_next_read = Some(kind);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Everything written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Number of notifications not yet picked up.
    pub fn pending_events(&self) -> usize {
        self.state.lock().pending_events.len()
    }

    /// Number of live handles onto this device.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }
}

impl Clone for MockSerialPort {
    /// Clones are observers and do not count as open handles.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            guard: None,
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(kind) = state.fail_next_write.take() {
            return Err(PortError::Io(std::io::Error::new(
                kind,
                "injected write failure",
            )));
        }

        state.write_log.push(data.to_vec());
        if state.loopback {
            state.read_queue.extend(data);
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(kind) = state.fail_next_read.take() {
            return Err(PortError::Io(std::io::Error::new(
                kind,
                "injected read failure",
            )));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !buffer.is_empty() && !state.hung_up {
            // Simulate "would block" behavior by returning an I/O error
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )));
        }

        Ok(bytes_read)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.state.lock().read_queue.len())
    }

    fn poll_event(&mut self) -> Result<Option<PortEvent>, PortError> {
        let mut state = self.state.lock();
        if let Some(event) = state.pending_events.pop_front() {
            return Ok(Some(event));
        }
        Ok((!state.read_queue.is_empty()).then_some(PortEvent::DataAvailable))
    }

    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(self.open_handle()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("counted", &self.guard.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct MockPlatformState {
    ports: Vec<PortDescriptor>,
    devices: HashMap<String, MockSerialPort>,
    /// Refusals left per busy port; `None` refuses forever.
    busy: HashMap<String, Option<usize>>,
    unsupported: HashSet<String>,
    enumeration_fails: bool,
    open_calls: usize,
    open_attempts: usize,
    last_owner: Option<String>,
}

/// In-memory port registry handing out [`MockSerialPort`] handles.
///
/// Cloning shares the registry, so a test can keep one clone for inspection
/// while the connector owns another.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockPlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry listing the given names as ports of unknown kind.
    pub fn with_ports(names: &[&str]) -> Self {
        let platform = Self::new();
        for name in names {
            platform.add_port(PortDescriptor::new(*name, PortKind::Unknown));
        }
        platform
    }

    pub fn add_port(&self, descriptor: PortDescriptor) {
        self.state.lock().ports.push(descriptor);
    }

    /// Observer onto the simulated device behind `name`.
    pub fn device(&self, name: &str) -> MockSerialPort {
        self.state
            .lock()
            .devices
            .entry(name.to_string())
            .or_insert_with(|| MockSerialPort::new(name))
            .clone()
    }

    /// Pretend another owner holds the port.
    pub fn set_busy(&self, name: &str) {
        self.state.lock().busy.insert(name.to_string(), None);
    }

    /// Pretend another owner holds the port for the next `attempts` opens.
    pub fn set_busy_for(&self, name: &str, attempts: usize) {
        self.state
            .lock()
            .busy
            .insert(name.to_string(), Some(attempts));
    }

    /// Pretend the driver rejects the line settings for the port.
    pub fn set_unsupported(&self, name: &str) {
        self.state.lock().unsupported.insert(name.to_string());
    }

    /// Make enumeration fail.
    pub fn fail_enumeration(&self) {
        self.state.lock().enumeration_fails = true;
    }

    /// Number of `open` calls that reached the platform.
    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    /// Individual open attempts, retries included.
    pub fn open_attempts(&self) -> usize {
        self.state.lock().open_attempts
    }

    /// Owner label passed to the most recent `open`.
    pub fn last_owner(&self) -> Option<String> {
        self.state.lock().last_owner.clone()
    }
}

impl SerialPlatform for MockPlatform {
    fn ports(&self) -> Result<Vec<PortDescriptor>, PortError> {
        let state = self.state.lock();
        if state.enumeration_fails {
            return Err(PortError::Io(std::io::Error::other(
                "injected enumeration failure",
            )));
        }
        Ok(state.ports.clone())
    }

    fn open(
        &self,
        descriptor: &PortDescriptor,
        owner: &str,
        _config: &PortConfiguration,
        open_timeout: Duration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        {
            let mut state = self.state.lock();
            state.open_calls += 1;
            state.last_owner = Some(owner.to_string());
        }

        retry_while_busy(&descriptor.name, open_timeout, || {
            self.try_open(&descriptor.name)
        })
    }
}

impl MockPlatform {
    /// One open attempt, as the OS would make it.
    fn try_open(&self, name: &str) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        state.open_attempts += 1;

        let refused = match state.busy.get_mut(name) {
            Some(None) => true,
            Some(Some(left)) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if refused {
            return Err(PortError::Busy(name.to_string()));
        }
        if state.unsupported.contains(name) {
            return Err(PortError::unsupported(format!(
                "{} rejects 9600 8N1",
                name
            )));
        }

        let device = state
            .devices
            .entry(name.to_string())
            .or_insert_with(|| MockSerialPort::new(name));
        Ok(Box::new(device.open_handle()))
    }
}
