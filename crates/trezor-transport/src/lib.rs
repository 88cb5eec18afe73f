//! WebUSB transport for Trezor hardware wallets.
//!
//! Moves fixed-size 64-byte chunks between the host and a device's
//! vendor-specific WebUSB interface, and discovers attached devices on
//! the bus. Message framing lives above this layer; chunk payloads are
//! never interpreted here.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Bus**: Bus driver abstraction (nusb backend, mock for tests)
//! - **Ident**: VID/PID classification and vendor-class filtering
//! - **Chunk**: fixed-size chunk I/O over one claimed interface
//! - **Transport**: enumeration, path identity, debug-session derivation
//! - **Protocol**: wire constants and the negotiated framing version
//!
//! # Example
//!
//! ```no_run
//! for transport in trezor_transport::enumerate().expect("bus scan failed") {
//!     println!("{} ({})", transport.path(), transport.identity());
//! }
//! ```

pub mod bus;
pub mod chunk;
pub mod ident;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use bus::mock::{MockBus, MockDevice};
pub use bus::nusb::{NusbBus, NusbDevice};
pub use bus::traits::{TransportError, UsbBus, UsbDevice, UsbHandle};
pub use chunk::{ChunkHandle, InterfaceSelection};
pub use ident::{DeviceIdentity, is_vendor_interface};
pub use protocol::{CHUNK_SIZE, Protocol};
pub use transport::{
    PATH_PREFIX, WebUsbTransport, device_path, enumerate, enumerate_with, find_by_path,
    find_by_path_with,
};
