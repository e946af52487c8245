//! Line-buffered text input over a serial handle.

use crate::port::{PortError, PortEvent, SerialPortAdapter};
use memchr::memchr;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const READ_CHUNK: usize = 256;

/// Splits the byte stream from a port into `\n` / `\r\n` terminated lines.
///
/// A read blocks until a terminator or end of stream arrives, but gives up
/// with [`PortError::Closed`] as soon as the shared open flag is cleared.
#[derive(Debug)]
pub(crate) struct LineReader {
    port: Box<dyn SerialPortAdapter>,
    buffer: Vec<u8>,
    open: Arc<AtomicBool>,
    idle_wait: Duration,
}

impl LineReader {
    pub(crate) fn new(
        port: Box<dyn SerialPortAdapter>,
        open: Arc<AtomicBool>,
        idle_wait: Duration,
    ) -> Self {
        Self {
            port,
            buffer: Vec::new(),
            open,
            idle_wait,
        }
    }

    /// A complete line is already buffered.
    pub(crate) fn has_buffered_line(&self) -> bool {
        memchr(b'\n', &self.buffer).is_some()
    }

    pub(crate) fn poll_event(&mut self) -> Result<Option<PortEvent>, PortError> {
        self.port.poll_event()
    }

    /// Read the next line, without its terminator.
    ///
    /// `Ok(None)` means the stream ended with nothing buffered. Text left
    /// without a terminator at end of stream is returned as a final line.
    /// Bytes of a line that fails to decode are consumed and lost.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>, PortError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(pos) = memchr(b'\n', &self.buffer) {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return decode(line).map(Some);
            }

            if !self.open.load(Ordering::Acquire) {
                return Err(PortError::Closed);
            }

            match self.port.read_bytes(&mut chunk) {
                Ok(0) if self.buffer.is_empty() => return Ok(None),
                Ok(0) => return decode(std::mem::take(&mut self.buffer)).map(Some),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.is_would_block() => thread::sleep(self.idle_wait),
                Err(PortError::Io(e)) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buffer.clear();
                    return Err(e);
                }
            }
        }
    }
}

fn decode(mut line: Vec<u8>) -> Result<String, PortError> {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(String::from_utf8(line)?)
}
