//! Utility functions for hardware testing.

use arduino_connector::{PortDescriptor, SerialPlatform, SystemPlatform};
use std::env;
use std::time::{Duration, Instant};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub loopback_enabled: bool,
    /// Only these paths are scanned when set (`TEST_SCAN_PATHS`, comma separated).
    pub scan_paths: Vec<String>,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");
        let scan_paths = env::var("TEST_SCAN_PATHS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(TestPortConfig {
            port_name,
            loopback_enabled,
            scan_paths,
        })
    }

    pub fn platform(&self) -> SystemPlatform {
        SystemPlatform::with_scan_paths(self.scan_paths.clone())
    }
}

/// Skip test if hardware is not available.
pub fn skip_without_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    config
}

/// Print the ports the system registry can see.
pub fn print_available_ports(platform: &SystemPlatform) -> Vec<PortDescriptor> {
    let ports = platform.ports().unwrap_or_default();
    if ports.is_empty() {
        println!("No serial ports detected on this system");
    }
    for (idx, port) in ports.iter().enumerate() {
        println!("  {}. {} ({})", idx + 1, port.name, port.kind);
    }
    ports
}

/// Timing helper for measuring operation duration.
pub struct TimingHelper {
    start: Instant,
    name: String,
}

impl TimingHelper {
    pub fn new(name: &str) -> Self {
        println!("Starting: {}", name);
        TimingHelper {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        println!("Completed: {} in {:?}", self.name, elapsed);
        elapsed
    }
}
