//! Port abstraction layer for serial communication.
//!
//! Provides the port registry, traits and implementations for serial I/O,
//! enabling dependency injection and testing via mocks.

pub mod error;
pub mod mock;
pub mod registry;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockPlatform, MockSerialPort};
pub use registry::{resolve, PortDescriptor, PortKind, SystemPlatform};
pub use sync_port::*;
pub use traits::*;
