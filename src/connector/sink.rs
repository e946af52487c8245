//! Consumers of inbound lines.

use std::io::Write;

/// Receives each line read from the device, on the notification thread.
///
/// Any `FnMut(String) + Send` closure is a sink:
///
/// ```
/// use arduino_connector::LineSink;
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let mut sink = move |line: String| {
///     let _ = tx.send(line);
/// };
/// sink.on_line("temp=21.5".to_string());
/// assert_eq!(rx.recv().unwrap(), "temp=21.5");
/// ```
pub trait LineSink: Send + 'static {
    fn on_line(&mut self, line: String);
}

impl<F> LineSink for F
where
    F: FnMut(String) + Send + 'static,
{
    fn on_line(&mut self, line: String) {
        self(line)
    }
}

/// Prints every line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn on_line(&mut self, line: String) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the listener down.
        if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
            tracing::trace!("stdout unavailable, line discarded");
        }
    }
}
