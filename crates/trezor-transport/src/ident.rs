//! Device identity classification and vendor-class filtering.

use std::fmt;

use crate::bus::traits::UsbDevice;
use crate::protocol::{
    CLASS_VENDOR_SPEC, DEV_TREZOR_ONE, DEV_TREZOR_T, DEV_TREZOR_T_BL, INTERFACE,
};

/// Classification of a bus device by its (vendor ID, product ID) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdentity {
    /// Trezor One running firmware.
    TrezorOne,
    /// Trezor Model T running firmware.
    TrezorT,
    /// Trezor Model T in bootloader mode.
    TrezorTBootloader,
    Unsupported,
}

impl DeviceIdentity {
    /// Pure, total classification of a VID/PID pair.
    pub fn classify(vendor_id: u16, product_id: u16) -> Self {
        match (vendor_id, product_id) {
            DEV_TREZOR_ONE => Self::TrezorOne,
            DEV_TREZOR_T => Self::TrezorT,
            DEV_TREZOR_T_BL => Self::TrezorTBootloader,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn is_bootloader(self) -> bool {
        matches!(self, Self::TrezorTBootloader)
    }

    /// Whether the device negotiates framing protocol v2. Bootloader-mode
    /// devices stay on v1.
    pub fn supports_protocol_v2(self) -> bool {
        matches!(self, Self::TrezorT)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrezorOne => write!(f, "Trezor One"),
            Self::TrezorT => write!(f, "Trezor Model T"),
            Self::TrezorTBootloader => write!(f, "Trezor Model T (bootloader)"),
            Self::Unsupported => write!(f, "unsupported device"),
        }
    }
}

/// True only if the device's communication interface is vendor-specific.
///
/// Composite devices can enumerate the same VID/PID with a HID interface
/// in front; building a transport over that sub-interface would yield a
/// non-functional channel, so the enumerator filters on this first.
pub fn is_vendor_interface<D: UsbDevice>(device: &D) -> bool {
    device.interface_class(INTERFACE) == Some(CLASS_VENDOR_SPEC)
}
