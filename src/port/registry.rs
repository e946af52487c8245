//! Port registry: enumeration and resolution of serial ports.
//!
//! `SystemPlatform` queries the OS through `serialport::available_ports` and
//! opens ports with [`SyncSerialPort`]. An optional scan-path list restricts
//! which device paths are considered; this replaces the process-wide
//! "which ports to scan" property some serial stacks rely on.

use super::error::PortError;
use super::sync_port::SyncSerialPort;
use super::traits::{PortConfiguration, SerialPlatform, SerialPortAdapter};
use serialport::{SerialPortInfo, SerialPortType};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Read-only record describing a port the platform knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// System name of the port ("/dev/ttyACM0", "COM3").
    pub name: String,
    /// What kind of device backs the port.
    pub kind: PortKind,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Hardware type of a port, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        manufacturer: Option<String>,
        product: Option<String>,
        serial_number: Option<String>,
    },
    Bluetooth,
    Pci,
    Unknown,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usb {
                vid,
                pid,
                manufacturer,
                product,
                ..
            } => {
                write!(f, "USB {:04x}:{:04x}", vid, pid)?;
                if let Some(m) = manufacturer {
                    write!(f, " {}", m)?;
                }
                if let Some(p) = product {
                    write!(f, " {}", p)?;
                }
                Ok(())
            }
            Self::Bluetooth => write!(f, "Bluetooth"),
            Self::Pci => write!(f, "PCI"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        let kind = match info.port_type {
            SerialPortType::UsbPort(usb) => PortKind::Usb {
                vid: usb.vid,
                pid: usb.pid,
                manufacturer: usb.manufacturer,
                product: usb.product,
                serial_number: usb.serial_number,
            },
            SerialPortType::BluetoothPort => PortKind::Bluetooth,
            SerialPortType::PciPort => PortKind::Pci,
            SerialPortType::Unknown => PortKind::Unknown,
        };
        Self::new(info.port_name, kind)
    }
}

/// Find the port whose name equals `identifier`.
///
/// Returns the first match in enumeration order.
pub fn resolve(platform: &dyn SerialPlatform, identifier: &str) -> Result<PortDescriptor, PortError> {
    let ports = platform.ports()?;
    debug!(count = ports.len(), identifier, "Enumerated serial ports");

    ports
        .into_iter()
        .find(|p| p.name == identifier)
        .ok_or_else(|| PortError::not_found(identifier))
}

/// The operating system's serial ports, accessed through `serialport`.
#[derive(Debug, Clone, Default)]
pub struct SystemPlatform {
    scan_paths: Vec<String>,
}

impl SystemPlatform {
    /// Platform that reports every port the OS enumerates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform restricted to the given device paths.
    ///
    /// An empty list means no restriction.
    pub fn with_scan_paths(scan_paths: Vec<String>) -> Self {
        Self { scan_paths }
    }

    pub fn scan_paths(&self) -> &[String] {
        &self.scan_paths
    }
}

impl SerialPlatform for SystemPlatform {
    fn ports(&self) -> Result<Vec<PortDescriptor>, PortError> {
        let enumerated = match serialport::available_ports() {
            Ok(ports) => ports,
            // Listed scan paths can still be probed on disk.
            Err(e) if !self.scan_paths.is_empty() => {
                warn!(error = %e, "Port enumeration failed, probing scan paths only");
                Vec::new()
            }
            Err(e) => return Err(PortError::Serial(e)),
        };

        let enumerated: Vec<PortDescriptor> =
            enumerated.into_iter().map(PortDescriptor::from).collect();

        if self.scan_paths.is_empty() {
            return Ok(enumerated);
        }

        let ports = self
            .scan_paths
            .iter()
            .filter_map(|path| {
                enumerated
                    .iter()
                    .find(|p| &p.name == path)
                    .cloned()
                    .or_else(|| {
                        Path::new(path)
                            .exists()
                            .then(|| PortDescriptor::new(path.clone(), PortKind::Unknown))
                    })
            })
            .collect();

        Ok(ports)
    }

    fn open(
        &self,
        descriptor: &PortDescriptor,
        owner: &str,
        config: &PortConfiguration,
        open_timeout: Duration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = SyncSerialPort::open_exclusive(&descriptor.name, owner, config, open_timeout)?;
        Ok(Box::new(port))
    }
}
