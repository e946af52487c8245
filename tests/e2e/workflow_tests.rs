//! Complete request/response workflows against a simulated board.

use crate::common::*;
use arduino_connector::{ConnectorError, PortEvent, ReaderState, SerialConnector};
use pretty_assertions::assert_eq;
use std::io::ErrorKind;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn test_lines_arrive_in_order() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (_arduino, lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.enqueue_read(b"A\r\n");
    device.enqueue_read(b"B\r\n");

    assert_eq!(recv_line(&lines), "A");
    assert_eq!(recv_line(&lines), "B");
    assert_no_line(&lines);
}

#[test]
fn test_line_split_across_reads() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (_arduino, lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.enqueue_read(b"TEMP=2");
    std::thread::sleep(QUIET_WINDOW / 2);
    device.enqueue_read(b"1.5\n");

    assert_eq!(recv_line(&lines), "TEMP=21.5");
}

#[test]
fn test_burst_of_lines() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (_arduino, lines) = connect_mock(&platform, MOCK_PORT);

    let burst: String = (0..50).map(|i| format!("sample {}\n", i)).collect();
    platform.device(MOCK_PORT).enqueue_read(burst.as_bytes());

    for i in 0..50 {
        assert_eq!(recv_line(&lines), format!("sample {}", i));
    }
}

#[test]
fn test_loopback_round_trip() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (arduino, lines) = connect_mock(&platform, MOCK_PORT);
    platform.device(MOCK_PORT).set_loopback(true);

    arduino.send("PING\n").unwrap();
    assert_eq!(recv_line(&lines), "PING");

    arduino.send_line("LED ON").unwrap();
    assert_eq!(recv_line(&lines), "LED ON");
}

#[test]
fn test_send_writes_exact_bytes() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (arduino, _lines) = connect_mock(&platform, MOCK_PORT);

    arduino.send("M1 200").unwrap();
    arduino.send("").unwrap();
    arduino.send("\r\n").unwrap();

    assert_eq!(platform.device(MOCK_PORT).written(), b"M1 200\r\n");
}

#[test]
fn test_invalid_utf8_line_is_dropped() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (arduino, lines) = connect_mock(&platform, MOCK_PORT);

    platform.device(MOCK_PORT).enqueue_read(b"\xc3\x28garbage\nREADY\n");

    assert_eq!(recv_line(&lines), "READY");
    assert!(arduino.is_open());
}

#[test]
fn test_read_failure_does_not_stop_listener() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (arduino, lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.fail_next_read(ErrorKind::BrokenPipe);
    device.enqueue_read(b"after\n");

    assert_eq!(recv_line(&lines), "after");
    assert_eq!(arduino.reader_state(), ReaderState::Registered);
}

#[test]
fn test_other_notifications_are_ignored() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (_arduino, lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.push_event(PortEvent::Break);
    device.push_event(PortEvent::CarrierDetect);
    device.push_event(PortEvent::FramingError);
    assert_no_line(&lines);
    assert_eq!(device.pending_events(), 0);

    device.enqueue_read(b"ok\n");
    assert_eq!(recv_line(&lines), "ok");
}

#[test]
fn test_write_failure_is_reported() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (arduino, _lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.fail_next_write(ErrorKind::BrokenPipe);
    let err = arduino.send("LED ON\n").unwrap_err();
    assert!(matches!(err, ConnectorError::StreamWriteFailure(_)));
    assert!(!err.is_construction_failure());

    // One failed write does not close the channel.
    arduino.send("LED OFF\n").unwrap();
    assert_eq!(device.written(), b"LED OFF\n");
}

#[test]
fn test_end_of_stream_flushes_partial_line() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (_arduino, lines) = connect_mock(&platform, MOCK_PORT);
    let device = platform.device(MOCK_PORT);

    device.enqueue_read(b"done\n");
    assert_eq!(recv_line(&lines), "done");

    device.hang_up();
    device.enqueue_read(b"no newline");
    assert_eq!(recv_line(&lines), "no newline");
}

#[test]
fn test_panicking_sink_keeps_listener_alive() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (tx, lines) = mpsc::channel();
    let _arduino = SerialConnector::builder(MOCK_PORT)
        .platform(platform.clone())
        .poll_interval(Duration::from_millis(1))
        .connect(move |line: String| {
            if line == "boom" {
                panic!("sink rejected line");
            }
            let _ = tx.send(line);
        })
        .unwrap();

    platform.device(MOCK_PORT).enqueue_read(b"boom\nfine\n");
    assert_eq!(recv_line(&lines), "fine");
}
