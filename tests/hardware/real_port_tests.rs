//! Tests requiring actual serial hardware.
//!
//! These tests are skipped if no hardware is available.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyACM0          # or COM3 on Windows
//! export TEST_LOOPBACK=1                 # if the port has TX-RX loopback
//! export TEST_SCAN_PATHS=/dev/ttyACM0    # optional, restricts the registry
//!
//! cargo test --features hardware-tests -- --ignored
//! ```

use super::utils::*;
use crate::common::LINE_TIMEOUT;
use arduino_connector::{ConnectorError, ReaderState, SerialConnector};
use std::sync::mpsc;
use std::time::Duration;

#[test]
#[ignore] // Run with --ignored flag
fn test_real_port_is_listed() {
    let config = match skip_without_hardware() {
        Some(c) => c,
        None => return,
    };

    let ports = print_available_ports(&config.platform());
    assert!(
        ports.iter().any(|p| p.name == config.port_name),
        "{} is not visible to the registry",
        config.port_name
    );
}

#[test]
#[ignore]
fn test_real_port_open_close() {
    let config = match skip_without_hardware() {
        Some(c) => c,
        None => return,
    };

    let timing = TimingHelper::new("open/close");
    let arduino = SerialConnector::builder(&config.port_name)
        .platform(config.platform())
        .connect(|_line: String| {})
        .unwrap_or_else(|e| panic!("Port open failed: {}", e));
    assert_eq!(arduino.reader_state(), ReaderState::Registered);

    arduino.close();
    assert_eq!(arduino.reader_state(), ReaderState::Closed);
    timing.finish();
}

#[test]
#[ignore]
fn test_real_port_is_exclusive() {
    let config = match skip_without_hardware() {
        Some(c) => c,
        None => return,
    };

    let first = SerialConnector::builder(&config.port_name)
        .platform(config.platform())
        .connect(|_line: String| {})
        .expect("Failed to open port");

    let second = SerialConnector::builder(&config.port_name)
        .platform(config.platform())
        .open_timeout(Duration::ZERO)
        .connect(|_line: String| {});
    assert!(matches!(second, Err(ConnectorError::PortBusy(_))));

    first.close();
}

#[test]
#[ignore]
fn test_real_port_loopback_communication() {
    let config = match skip_without_hardware() {
        Some(c) => c,
        None => return,
    };
    if !config.loopback_enabled {
        println!("Skipping loopback test: TEST_LOOPBACK not set to 1");
        return;
    }

    let (tx, lines) = mpsc::channel();
    let arduino = SerialConnector::builder(&config.port_name)
        .platform(config.platform())
        .connect(move |line: String| {
            let _ = tx.send(line);
        })
        .expect("Failed to open port");

    arduino.send_line("LOOPBACK TEST").expect("Failed to write");
    let echoed = lines
        .recv_timeout(LINE_TIMEOUT)
        .expect("Nothing looped back");
    assert_eq!(echoed, "LOOPBACK TEST");

    arduino.close();
}
