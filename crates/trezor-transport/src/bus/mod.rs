//! Bus driver abstraction over packet-oriented USB.

pub mod mock;
pub mod nusb;
pub mod traits;

use std::sync::OnceLock;

pub use self::mock::{MockBus, MockDevice};
pub use self::nusb::{NusbBus, NusbDevice};
pub use self::traits::{TransportError, UsbBus, UsbDevice, UsbHandle};

static GLOBAL_BUS: OnceLock<NusbBus> = OnceLock::new();

/// Process-wide bus instance, created lazily on first use and never
/// recreated for the lifetime of the process. nusb keeps no libusb-style
/// context object, so there is nothing to tear down beyond what the OS
/// reclaims at process exit.
pub fn global() -> &'static NusbBus {
    GLOBAL_BUS.get_or_init(NusbBus::new)
}
