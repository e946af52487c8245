//! The serial connector.
//!
//! A [`SerialConnector`] owns one exclusively opened serial channel. Building it
//! resolves the port by name, opens it at 9600 8N1, and registers a
//! notification thread that reads one line per data-available event and hands
//! it to a [`LineSink`]. Writes happen synchronously on the caller's thread.
//!
//! # Lifecycle
//!
//! ```text
//! builder ──connect()──> Registered ──close()/drop──> Closed
//!    │
//!    └── resolve / open / spawn failure: Err(ConnectorError), nothing left open
//! ```
//!
//! # Example
//!
//! ```no_run
//! use arduino_connector::{SerialConnector, StdoutSink};
//!
//! let arduino = SerialConnector::new("/dev/ttyACM0", StdoutSink)?;
//! arduino.send_line("LED ON")?;
//! arduino.close();
//! # Ok::<(), arduino_connector::ConnectorError>(())
//! ```

mod line_reader;
mod notifier;
mod sink;

pub use sink::{LineSink, StdoutSink};

use crate::error::{ConnectorError, ConnectorResult};
use crate::port::{
    resolve, PortConfiguration, PortError, SerialPlatform, SerialPortAdapter, SystemPlatform,
};
use line_reader::LineReader;
use notifier::Notifier;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{error, info, info_span, trace};

/// Milliseconds to wait for a busy port to become available.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(2000);

/// How often the notification thread polls for events.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Owner label reported for ports opened by this crate.
pub const DEFAULT_OWNER_LABEL: &str = "arduino_connector::SerialConnector";

/// Where the event-driven reader is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Channel open, listener not yet started.
    Unregistered,
    /// Listener running; lines are being delivered.
    Registered,
    /// Listener stopped and channel released. Terminal.
    Closed,
}

/// Options for building a [`SerialConnector`].
#[derive(Debug)]
pub struct ConnectorBuilder {
    port: String,
    owner_label: String,
    open_timeout: Duration,
    poll_interval: Duration,
    platform: Box<dyn SerialPlatform>,
}

impl ConnectorBuilder {
    fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            owner_label: DEFAULT_OWNER_LABEL.to_string(),
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            platform: Box::new(SystemPlatform::new()),
        }
    }

    /// Diagnostic label recorded as the port's owner.
    pub fn owner_label(mut self, label: impl Into<String>) -> Self {
        self.owner_label = label.into();
        self
    }

    /// How long to wait for a busy port. Zero fails at once.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Restrict the system registry to these device paths.
    ///
    /// Replaces any platform set earlier with a [`SystemPlatform`].
    pub fn scan_paths(mut self, paths: Vec<String>) -> Self {
        self.platform = Box::new(SystemPlatform::with_scan_paths(paths));
        self
    }

    /// Use another port registry, such as [`MockPlatform`](crate::port::MockPlatform).
    pub fn platform(mut self, platform: impl SerialPlatform + 'static) -> Self {
        self.platform = Box::new(platform);
        self
    }

    /// Resolve, open and configure the port, then start the listener.
    ///
    /// Either every step succeeds or nothing is left open: on error no handle
    /// onto the port survives and no thread is running.
    pub fn connect(self, sink: impl LineSink) -> ConnectorResult<SerialConnector> {
        let span = info_span!("connect", port = %self.port, owner = %self.owner_label);
        let _enter = span.enter();

        let descriptor = resolve(&*self.platform, &self.port)
            .map_err(|e| report(ConnectorError::from_open(e)))?;

        let config = PortConfiguration::default();
        let writer = self
            .platform
            .open(&descriptor, &self.owner_label, &config, self.open_timeout)
            .map_err(|e| report(ConnectorError::from_open(e)))?;

        let reader_port = writer
            .try_clone_adapter()
            .map_err(|e| report(ConnectorError::Channel(e)))?;

        let open = Arc::new(AtomicBool::new(true));
        let reader = LineReader::new(reader_port, Arc::clone(&open), self.poll_interval);
        let notifier = Notifier::new(
            self.port.clone(),
            reader,
            Box::new(sink),
            Arc::clone(&open),
            self.poll_interval,
        );

        let mut channel = Channel::new(writer);
        let listener = thread::Builder::new()
            .name(format!("serial-notify:{}", self.port))
            .spawn(move || notifier.run())
            .map_err(|e| report(ConnectorError::Spawn(e)))?;
        let listener_id = listener.thread().id();
        channel.register(listener);

        info!(kind = %descriptor.kind, "Serial connector ready");

        Ok(SerialConnector {
            port: self.port,
            owner_label: self.owner_label,
            open,
            listener_id,
            channel: Mutex::new(channel),
            closing: Mutex::new(()),
        })
    }
}

fn report(err: ConnectorError) -> ConnectorError {
    error!(error = %err, "Serial connector construction failed");
    err
}

/// Channel state guarded by the connector's lock.
#[derive(Debug)]
struct Channel {
    writer: Option<Box<dyn SerialPortAdapter>>,
    listener: Option<JoinHandle<()>>,
    state: ReaderState,
}

impl Channel {
    fn new(writer: Box<dyn SerialPortAdapter>) -> Self {
        Self {
            writer: Some(writer),
            listener: None,
            state: ReaderState::Unregistered,
        }
    }

    fn register(&mut self, listener: JoinHandle<()>) {
        debug_assert_eq!(self.state, ReaderState::Unregistered);
        self.listener = Some(listener);
        self.state = ReaderState::Registered;
    }
}

/// One open serial channel to a device.
///
/// `send` and `close` may be called from any thread; the sink runs on the
/// connector's notification thread. The port is held exclusively by the OS
/// for as long as the connector is open.
pub struct SerialConnector {
    port: String,
    owner_label: String,
    open: Arc<AtomicBool>,
    listener_id: ThreadId,
    channel: Mutex<Channel>,
    /// Serializes `close` calls made outside the notification thread.
    closing: Mutex<()>,
}

impl SerialConnector {
    /// Connect to `port` through the system registry with default options.
    pub fn new(port: impl Into<String>, sink: impl LineSink) -> ConnectorResult<Self> {
        Self::builder(port).connect(sink)
    }

    pub fn builder(port: impl Into<String>) -> ConnectorBuilder {
        ConnectorBuilder::new(port)
    }

    /// Write `text` to the device, blocking until the driver has taken it.
    ///
    /// # Errors
    ///
    /// - `ConnectorError::AlreadyClosed` after [`close`](Self::close)
    /// - `ConnectorError::StreamWriteFailure` if the transport rejects the bytes
    pub fn send(&self, text: &str) -> ConnectorResult<()> {
        let mut channel = self.channel.lock();
        let writer = channel
            .writer
            .as_mut()
            .ok_or(ConnectorError::AlreadyClosed)?;

        write_all(&mut **writer, text.as_bytes()).map_err(ConnectorError::from_write)?;
        trace!(port = %self.port, bytes = text.len(), "Sent");
        Ok(())
    }

    /// [`send`](Self::send) followed by a `\n` terminator.
    pub fn send_line(&self, text: &str) -> ConnectorResult<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.send(&line)
    }

    /// Stop notifications and release the port.
    ///
    /// Idempotent. When called from any thread other than the notification
    /// thread, no sink callback runs after this returns. When called from inside
    /// the sink, the current callback is the last one.
    pub fn close(&self) {
        let on_listener = thread::current().id() == self.listener_id;
        let _closing = (!on_listener).then(|| self.closing.lock());

        let listener = {
            let mut channel = self.channel.lock();
            let was_open = self.open.swap(false, Ordering::AcqRel);
            channel.writer = None;
            channel.state = ReaderState::Closed;
            if was_open {
                info!(port = %self.port, "Closing serial connector");
            }
            if on_listener {
                None
            } else {
                channel.listener.take()
            }
        };

        if let Some(handle) = listener {
            if handle.join().is_err() {
                error!(port = %self.port, "Notification thread panicked");
            }
            info!(port = %self.port, "Serial port released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn reader_state(&self) -> ReaderState {
        self.channel.lock().state
    }

    /// The port identifier this connector was built with.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Change the stored identifier. The open channel is not affected.
    pub fn set_port(&mut self, port: impl Into<String>) {
        self.port = port.into();
    }

    pub fn owner_label(&self) -> &str {
        &self.owner_label
    }
}

fn write_all(writer: &mut dyn SerialPortAdapter, mut data: &[u8]) -> Result<(), PortError> {
    use std::io::{Error, ErrorKind};

    while !data.is_empty() {
        match writer.write_bytes(data) {
            Ok(0) => {
                return Err(PortError::Io(Error::new(
                    ErrorKind::WriteZero,
                    "serial port accepted no bytes",
                )))
            }
            Ok(n) => data = &data[n..],
            Err(PortError::Io(e)) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    writer.flush()
}

impl Drop for SerialConnector {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SerialConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialConnector")
            .field("port", &self.port)
            .field("owner_label", &self.owner_label)
            .field("state", &self.reader_state())
            .finish()
    }
}
