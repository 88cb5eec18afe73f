//! WebUSB transport: enumeration, path identity and debug sessions.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::bus;
use crate::bus::nusb::NusbDevice;
use crate::bus::traits::{TransportError, UsbBus, UsbDevice};
use crate::chunk::{ChunkHandle, InterfaceSelection};
use crate::ident::{DeviceIdentity, is_vendor_interface};
use crate::protocol::Protocol;

/// Prefix of every path identity produced by this transport.
pub const PATH_PREFIX: &str = "webusb";

/// A session with one device: a chunk handle bound to a negotiated
/// framing protocol, plus the descriptor it came from.
///
/// The chunk handle is shared (`Arc`) so the framing layer can drive it
/// and so v2 debug sessions can reuse the same physical channel.
pub struct WebUsbTransport<D: UsbDevice> {
    device: D,
    identity: DeviceIdentity,
    protocol: Protocol,
    handle: Arc<Mutex<ChunkHandle<D>>>,
}

impl<D: UsbDevice> WebUsbTransport<D> {
    /// Bind a transport to a device over its normal interface.
    pub fn new(device: D) -> Self {
        Self::with_selection(device, InterfaceSelection::Normal)
    }

    fn with_selection(device: D, selection: InterfaceSelection) -> Self {
        let identity = DeviceIdentity::classify(device.vendor_id(), device.product_id());
        let protocol = Protocol::negotiate(identity.supports_protocol_v2());
        let handle = Arc::new(Mutex::new(ChunkHandle::new(device.clone(), selection)));
        Self {
            device,
            identity,
            protocol,
            handle,
        }
    }

    pub fn open(&self) -> Result<(), TransportError> {
        self.handle.lock().unwrap().open()
    }

    pub fn close(&self) {
        self.handle.lock().unwrap().close()
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The chunk handle, shared with the framing layer that drives it.
    pub fn chunk_handle(&self) -> Arc<Mutex<ChunkHandle<D>>> {
        Arc::clone(&self.handle)
    }

    /// Stable path identity of the underlying physical port.
    pub fn path(&self) -> String {
        device_path(&self.device)
    }

    /// Derive the debug-link session for this device.
    ///
    /// Protocol v1 devices expose a second USB interface for debug
    /// traffic, so the result owns a fresh chunk handle on that
    /// interface. Protocol v2 multiplexes debug traffic over the one
    /// physical channel via framing-level session ids, so the result
    /// shares this transport's chunk handle; upstream marks that mode as
    /// unverified on real multi-session devices. Never mutates `self`.
    pub fn find_debug(&self) -> WebUsbTransport<D> {
        if self.protocol.version() >= 2 {
            WebUsbTransport {
                device: self.device.clone(),
                identity: self.identity,
                protocol: self.protocol,
                handle: Arc::clone(&self.handle),
            }
        } else {
            Self::with_selection(self.device.clone(), InterfaceSelection::Debug)
        }
    }
}

/// Path identity of a device: `webusb:BBB:P[:P...]` with the 3-digit
/// zero-padded bus number and the port numbers down from the root hub.
/// Deterministic for a physical port across enumeration calls.
pub fn device_path<D: UsbDevice>(device: &D) -> String {
    let mut path = format!("{PATH_PREFIX}:{:03}", device.bus_number());
    for port in device.port_numbers() {
        let _ = write!(path, ":{port}");
    }
    path
}

/// Scan the process-wide bus and build a transport for every live,
/// supported device.
pub fn enumerate() -> Result<Vec<WebUsbTransport<NusbDevice>>, TransportError> {
    enumerate_with(bus::global())
}

/// [`enumerate`] over an arbitrary bus driver.
pub fn enumerate_with<B: UsbBus>(
    bus: &B,
) -> Result<Vec<WebUsbTransport<B::Device>>, TransportError> {
    let mut transports = Vec::new();
    for device in bus.devices()? {
        let identity = DeviceIdentity::classify(device.vendor_id(), device.product_id());
        if !identity.is_supported() {
            continue;
        }
        if !is_vendor_interface(&device) {
            debug!(
                vid = %format!("{:04x}", device.vendor_id()),
                pid = %format!("{:04x}", device.product_id()),
                "skipping non-vendor-class interface"
            );
            continue;
        }
        // Liveness probe. Some Windows driver/libusb combinations list the
        // device twice (WebUSB and HID) and one entry is non-functional;
        // that entry answers the probe with "not supported" and is dropped.
        match device.read_product_string() {
            Ok(_) => transports.push(WebUsbTransport::new(device)),
            Err(TransportError::NotSupported) => {
                debug!("skipping non-functional duplicate enumeration");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(transports)
}

/// Re-select a specific device across scans by its path identity.
pub fn find_by_path(path: &str) -> Result<WebUsbTransport<NusbDevice>, TransportError> {
    find_by_path_with(bus::global(), path)
}

/// [`find_by_path`] over an arbitrary bus driver.
pub fn find_by_path_with<B: UsbBus>(
    bus: &B,
    path: &str,
) -> Result<WebUsbTransport<B::Device>, TransportError> {
    enumerate_with(bus)?
        .into_iter()
        .find(|transport| transport.path() == path)
        .ok_or_else(|| TransportError::NoDevice(path.to_owned()))
}
