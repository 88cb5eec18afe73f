//! Bus driver traits and the transport error taxonomy.
//!
//! Defines the `UsbBus` / `UsbDevice` / `UsbHandle` traits for bus access,
//! allowing different implementations (nusb, mock, etc.).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// Open or claim failed. Typically a permissions or driver problem;
    /// never retried at this layer.
    #[error("cannot open device: {message}")]
    DeviceOpen { message: String },

    #[error("failed to claim interface {interface}: {message}")]
    ClaimInterface { interface: u8, message: String },

    /// A transfer produced a buffer of the wrong length. Treated as a
    /// protocol-corrupting condition; never retried.
    #[error("unexpected chunk size: {actual} (expected {expected})")]
    ChunkSize { actual: usize, expected: usize },

    /// The descriptor query is not supported on this enumeration entry.
    /// Marks a duplicate ghost enumeration; absorbed during `enumerate`,
    /// every other error class propagates.
    #[error("operation not supported")]
    NotSupported,

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("enumeration failed: {0}")]
    Enumeration(String),

    #[error("no device found at {0}")]
    NoDevice(String),
}

/// One scan of the bus.
///
/// Each call performs a fresh walk; nothing is cached between calls.
/// Implementations skip individual descriptors that fail introspection
/// mid-scan instead of aborting the walk, since devices can disappear
/// while it runs.
pub trait UsbBus {
    type Device: UsbDevice;

    fn devices(&self) -> Result<Vec<Self::Device>, TransportError>;
}

/// A borrowed bus device descriptor, cheap to clone. Pure introspection
/// except for `read_product_string` and `open`.
pub trait UsbDevice: Clone {
    type Handle: UsbHandle;

    fn vendor_id(&self) -> u16;

    fn product_id(&self) -> u16;

    fn bus_number(&self) -> u8;

    /// Port numbers from the root hub down to the device.
    fn port_numbers(&self) -> Vec<u8>;

    /// USB class of the given interface (configuration 0, alt-setting 0),
    /// or `None` if the descriptor lacks it.
    fn interface_class(&self, interface: u8) -> Option<u8>;

    /// Best-effort product-string query, used as a liveness probe during
    /// enumeration. `Err(TransportError::NotSupported)` marks the entry as
    /// a non-functional duplicate.
    fn read_product_string(&self) -> Result<String, TransportError>;

    fn open(&self) -> Result<Self::Handle, TransportError>;
}

/// An open device connection.
///
/// Callers serialize reads and writes themselves; there is no internal
/// locking and no timeout below this layer. Closing the handle from
/// another thread of control makes a blocked transfer fail rather than
/// return cleanly.
pub trait UsbHandle {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError>;

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError>;

    /// One interrupt transfer to an OUT endpoint.
    fn write_interrupt(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError>;

    /// One bounded interrupt transfer from an IN endpoint (address carries
    /// the direction bit). May legitimately return an empty buffer.
    fn read_interrupt(&mut self, endpoint: u8, max_len: usize) -> Result<Vec<u8>, TransportError>;

    fn close(&mut self);
}
