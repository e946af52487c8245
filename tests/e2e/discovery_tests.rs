//! Port resolution and construction failure tests.
//!
//! Every failure here must leave nothing open: no handle on the device and no
//! open call for ports that never resolved.

use crate::common::*;
use arduino_connector::{
    ConnectorError, MockPlatform, PortDescriptor, PortKind, ReaderState, SerialConnector,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn try_connect(
    platform: &MockPlatform,
    port: &str,
    open_timeout: Duration,
) -> Result<SerialConnector, ConnectorError> {
    SerialConnector::builder(port)
        .platform(platform.clone())
        .open_timeout(open_timeout)
        .poll_interval(Duration::from_millis(1))
        .connect(|_line: String| {})
}

#[test]
fn test_connect_to_listed_port() {
    let platform = mock_platform(&["COM3", MOCK_PORT]);
    let (arduino, _lines) = connect_mock(&platform, MOCK_PORT);

    assert_eq!(arduino.port(), MOCK_PORT);
    assert_eq!(arduino.reader_state(), ReaderState::Registered);
    assert_eq!(platform.open_calls(), 1);
    assert_eq!(platform.device("COM3").open_handles(), 0);
}

#[test]
fn test_connect_to_usb_board() {
    let platform = MockPlatform::new();
    platform.add_port(PortDescriptor::new(
        "/dev/ttyACM0",
        PortKind::Usb {
            vid: 0x2341,
            pid: 0x0043,
            manufacturer: Some("Arduino".to_string()),
            product: Some("Uno".to_string()),
            serial_number: None,
        },
    ));

    let (arduino, _lines) = connect_mock(&platform, "/dev/ttyACM0");
    assert!(arduino.is_open());
}

#[test]
fn test_unknown_port_is_not_found() {
    let platform = mock_platform(&["COM3", "COM4"]);

    let err = try_connect(&platform, "COM9", Duration::ZERO).unwrap_err();
    assert!(matches!(&err, ConnectorError::PortNotFound(name) if name == "COM9"));
    assert!(err.is_construction_failure());
    assert_eq!(platform.open_calls(), 0);
}

#[test]
fn test_empty_registry_is_not_found() {
    let platform = MockPlatform::new();

    let err = try_connect(&platform, "/dev/ttyACM0", Duration::ZERO).unwrap_err();
    assert!(matches!(err, ConnectorError::PortNotFound(_)));
}

#[test]
fn test_resolution_is_exact() {
    let platform = mock_platform(&["/dev/ttyACM0"]);

    for near_miss in ["/dev/ttyACM", "/dev/ttyacm0", "ttyACM0", "/dev/ttyACM0 "] {
        let err = try_connect(&platform, near_miss, Duration::ZERO).unwrap_err();
        assert!(
            matches!(err, ConnectorError::PortNotFound(_)),
            "{:?} should not resolve",
            near_miss
        );
    }
    assert_eq!(platform.open_calls(), 0);
}

#[test]
fn test_busy_port_fails_immediately_without_timeout() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.set_busy(MOCK_PORT);

    let err = try_connect(&platform, MOCK_PORT, Duration::ZERO).unwrap_err();
    assert!(matches!(&err, ConnectorError::PortBusy(name) if name == MOCK_PORT));
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 0);
}

#[test]
fn test_busy_port_times_out() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.set_busy(MOCK_PORT);

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let err = try_connect(&platform, MOCK_PORT, timeout).unwrap_err();
    match err {
        ConnectorError::PortOpenTimeout { port, waited } => {
            assert_eq!(port, MOCK_PORT);
            assert!(waited >= timeout);
        }
        other => panic!("expected PortOpenTimeout, got {:?}", other),
    }
    assert!(started.elapsed() >= timeout);
    assert!(platform.open_attempts() > 1);
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 0);
}

#[test]
fn test_connect_waits_for_busy_port_to_free_up() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.set_busy_for(MOCK_PORT, 3);

    let started = Instant::now();
    let arduino = try_connect(&platform, MOCK_PORT, Duration::from_secs(2)).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(platform.open_attempts(), 4);
    assert_eq!(arduino.reader_state(), ReaderState::Registered);
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 2);
}

#[test]
fn test_port_freed_too_late_times_out() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.set_busy_for(MOCK_PORT, 100);

    let err = try_connect(&platform, MOCK_PORT, Duration::from_millis(120)).unwrap_err();
    assert!(matches!(err, ConnectorError::PortOpenTimeout { .. }));
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 0);
}

#[test]
fn test_unsupported_configuration() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.set_unsupported(MOCK_PORT);

    let err = try_connect(&platform, MOCK_PORT, Duration::ZERO).unwrap_err();
    assert!(matches!(err, ConnectorError::UnsupportedConfiguration(_)));
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 0);
}

#[test]
fn test_enumeration_failure() {
    let platform = mock_platform(&[MOCK_PORT]);
    platform.fail_enumeration();

    let err = try_connect(&platform, MOCK_PORT, Duration::ZERO).unwrap_err();
    assert!(matches!(err, ConnectorError::Enumeration(_)));
    assert!(err.is_construction_failure());
    assert_eq!(platform.open_calls(), 0);
}

#[test]
fn test_second_connector_on_same_port_is_refused() {
    let platform = mock_platform(&[MOCK_PORT]);
    let (first, _lines) = connect_mock(&platform, MOCK_PORT);

    // The OS refuses a second exclusive open; the mock models that here.
    platform.set_busy(MOCK_PORT);
    let err = try_connect(&platform, MOCK_PORT, Duration::ZERO).unwrap_err();
    assert!(matches!(err, ConnectorError::PortBusy(_)));

    assert!(first.is_open());
    assert_eq!(platform.device(MOCK_PORT).open_handles(), 2);
}

#[test]
fn test_owner_label_reaches_platform() {
    let platform = mock_platform(&[MOCK_PORT]);
    let arduino = SerialConnector::builder(MOCK_PORT)
        .platform(platform.clone())
        .owner_label("greenhouse-controller")
        .connect(|_line: String| {})
        .unwrap();

    assert_eq!(arduino.owner_label(), "greenhouse-controller");
    assert_eq!(
        platform.last_owner().as_deref(),
        Some("greenhouse-controller")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unlisted_identifier_never_opens(identifier in "[ -~]{0,24}") {
        prop_assume!(identifier != MOCK_PORT && identifier != "COM3");
        let platform = mock_platform(&[MOCK_PORT, "COM3"]);

        let result = try_connect(&platform, &identifier, Duration::ZERO);

        prop_assert!(matches!(result, Err(ConnectorError::PortNotFound(_))));
        prop_assert_eq!(platform.open_calls(), 0);
    }
}

#[cfg(unix)]
#[test]
fn test_held_pty_is_busy_for_second_connector() {
    use serialport::SerialPort;

    let (_master, slave) = serialport::TTYPort::pair().expect("Failed to create pty pair");
    let path = slave.name().expect("pty slave has a name");
    let connect = |open_timeout: Duration| {
        SerialConnector::builder(path.as_str())
            .scan_paths(vec![path.clone()])
            .open_timeout(open_timeout)
            .connect(|_line: String| {})
    };

    let first = connect(Duration::ZERO).expect("first connector should open the pty");

    let second = connect(Duration::ZERO).unwrap_err();
    assert!(
        matches!(&second, ConnectorError::PortBusy(name) if *name == path),
        "expected PortBusy, got {:?}",
        second
    );

    let waited = connect(Duration::from_millis(150)).unwrap_err();
    assert!(
        matches!(waited, ConnectorError::PortOpenTimeout { .. }),
        "expected PortOpenTimeout, got {:?}",
        waited
    );

    first.close();
    assert!(connect(Duration::ZERO).is_ok());
}
