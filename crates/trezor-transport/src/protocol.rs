//! Wire constants and the negotiated framing surface.

/// Trezor One (firmware).
pub const DEV_TREZOR_ONE: (u16, u16) = (0x534C, 0x0001);
/// Trezor Model T (firmware).
pub const DEV_TREZOR_T: (u16, u16) = (0x1209, 0x53C1);
/// Trezor Model T (bootloader).
pub const DEV_TREZOR_T_BL: (u16, u16) = (0x1209, 0x53C0);

/// Atomic transfer granularity of the transport. Every interrupt transfer
/// carries exactly this many bytes.
pub const CHUNK_SIZE: usize = 64;

/// Normal communication interface and its OUT endpoint number.
pub const INTERFACE: u8 = 0;
pub const ENDPOINT: u8 = 1;

/// Secondary debug-link interface and endpoint (protocol v1 only).
pub const DEBUG_INTERFACE: u8 = 1;
pub const DEBUG_ENDPOINT: u8 = 2;

/// Device-to-host direction bit in an endpoint address.
pub const ENDPOINT_DIR_IN: u8 = 0x80;

/// Vendor-specific USB interface class.
pub const CLASS_VENDOR_SPEC: u8 = 0xFF;

/// Framing protocol negotiated for one device.
///
/// The message codec that packs requests into chunks lives above this
/// crate; this layer only records the negotiated version, which decides
/// how a debug session is derived (see
/// [`WebUsbTransport::find_debug`](crate::transport::WebUsbTransport::find_debug)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    version: u32,
}

impl Protocol {
    /// Negotiate from the device-identity hint: v2-capable devices speak
    /// protocol 2, everything else speaks protocol 1.
    pub fn negotiate(v2_capable: bool) -> Self {
        Self {
            version: if v2_capable { 2 } else { 1 },
        }
    }

    pub fn version(self) -> u32 {
        self.version
    }
}
