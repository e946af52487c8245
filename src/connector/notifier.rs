//! The notification thread.
//!
//! `serialport` has no callback API, so each connector runs one thread that
//! polls its input handle for events and dispatches them in arrival order.
//! Only `DataAvailable` is acted on: one line is read and handed to the sink.

use super::line_reader::LineReader;
use super::sink::LineSink;
use crate::error::ConnectorError;
use crate::port::{PortError, PortEvent};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

pub(crate) struct Notifier {
    port: String,
    reader: LineReader,
    sink: Box<dyn LineSink>,
    open: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Notifier {
    pub(crate) fn new(
        port: String,
        reader: LineReader,
        sink: Box<dyn LineSink>,
        open: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            port,
            reader,
            sink,
            open,
            poll_interval,
        }
    }

    /// Poll and dispatch until the connector is closed.
    pub(crate) fn run(mut self) {
        debug!(port = %self.port, "Notification thread started");
        let mut poll_failing = false;

        while self.open.load(Ordering::Acquire) {
            let event = if self.reader.has_buffered_line() {
                Some(PortEvent::DataAvailable)
            } else {
                match self.reader.poll_event() {
                    Ok(event) => {
                        poll_failing = false;
                        event
                    }
                    Err(e) => {
                        if !poll_failing {
                            warn!(port = %self.port, error = %e, "Polling serial port failed");
                        }
                        poll_failing = true;
                        None
                    }
                }
            };

            match event {
                Some(event) => self.dispatch(event),
                None => thread::sleep(self.poll_interval),
            }
        }

        debug!(port = %self.port, "Notification thread stopped");
    }

    fn dispatch(&mut self, event: PortEvent) {
        if event != PortEvent::DataAvailable {
            trace!(port = %self.port, ?event, "Ignoring notification");
            return;
        }

        match self.reader.read_line() {
            Ok(Some(line)) => {
                if !self.open.load(Ordering::Acquire) {
                    return;
                }
                trace!(port = %self.port, bytes = line.len(), "Line received");
                let sink = &mut self.sink;
                if catch_unwind(AssertUnwindSafe(|| sink.on_line(line))).is_err() {
                    error!(port = %self.port, "Line sink panicked; line dropped");
                }
            }
            Ok(None) => trace!(port = %self.port, "End of stream with nothing buffered"),
            Err(PortError::Closed) => debug!(port = %self.port, "Line read interrupted by close"),
            Err(e) => {
                let err = ConnectorError::StreamReadFailure(e);
                warn!(port = %self.port, error = %err, "Dropped inbound line");
            }
        }
    }
}
