//! nusb-based bus driver backend.

use nusb::transfer::{In, Interrupt, Out};
use nusb::{MaybeFuture, list_devices};
use std::io::{Read, Write};
use tracing::{debug, info};

use super::traits::{TransportError, UsbBus, UsbDevice, UsbHandle};

/// Remediation hint appended to open failures on platforms known to need
/// extra configuration.
fn open_hint() -> &'static str {
    if cfg!(target_os = "linux") {
        ". Do you have the udev rules installed? \
         https://github.com/trezor/trezor-common/blob/master/udev/51-trezor.rules"
    } else {
        ""
    }
}

/// Production bus backed by nusb. Use [`crate::bus::global`] rather than
/// constructing one per scan.
pub struct NusbBus;

impl NusbBus {
    pub(crate) fn new() -> Self {
        NusbBus
    }
}

impl UsbBus for NusbBus {
    type Device = NusbDevice;

    fn devices(&self) -> Result<Vec<NusbDevice>, TransportError> {
        // nusb already drops descriptors that fail introspection mid-scan,
        // which gives us the tolerant walk the enumerator expects.
        let list = list_devices()
            .wait()
            .map_err(|e| TransportError::Enumeration(e.to_string()))?;
        Ok(list.map(NusbDevice::from_info).collect())
    }
}

/// One enumerated device descriptor.
#[derive(Clone)]
pub struct NusbDevice {
    info: nusb::DeviceInfo,
}

impl NusbDevice {
    fn from_info(info: nusb::DeviceInfo) -> Self {
        Self { info }
    }
}

impl UsbDevice for NusbDevice {
    type Handle = NusbHandle;

    fn vendor_id(&self) -> u16 {
        self.info.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.info.product_id()
    }

    fn bus_number(&self) -> u8 {
        self.info.busnum()
    }

    fn port_numbers(&self) -> Vec<u8> {
        self.info.port_chain().to_vec()
    }

    fn interface_class(&self, interface: u8) -> Option<u8> {
        self.info
            .interfaces()
            .find(|i| i.interface_number() == interface)
            .map(|i| i.class())
    }

    fn read_product_string(&self) -> Result<String, TransportError> {
        // Ghost enumerations (a device visible both as WebUSB and HID on
        // some Windows driver combinations) surface here with no readable
        // product string.
        self.info
            .product_string()
            .map(str::to_owned)
            .ok_or(TransportError::NotSupported)
    }

    fn open(&self) -> Result<NusbHandle, TransportError> {
        let device = self
            .info
            .open()
            .wait()
            .map_err(|e| TransportError::DeviceOpen {
                message: format!("{e}{}", open_hint()),
            })?;

        info!(
            vid = %format!("{:04x}", self.info.vendor_id()),
            pid = %format!("{:04x}", self.info.product_id()),
            "opened device"
        );

        Ok(NusbHandle {
            device,
            interface: None,
        })
    }
}

/// An open nusb connection, holding the claimed interface while open.
pub struct NusbHandle {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
}

impl UsbHandle for NusbHandle {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        let claimed = self
            .device
            .claim_interface(interface)
            .wait()
            .map_err(|e| TransportError::ClaimInterface {
                interface,
                message: e.to_string(),
            })?;
        debug!(interface, "claimed interface");
        self.interface = Some(claimed);
        Ok(())
    }

    fn release_interface(&mut self, _interface: u8) -> Result<(), TransportError> {
        // Dropping the Interface releases the claim.
        self.interface = None;
        Ok(())
    }

    fn write_interrupt(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError> {
        let interface = self
            .interface
            .as_ref()
            .ok_or_else(|| TransportError::WriteFailed("interface not claimed".into()))?;

        let ep = interface
            .endpoint::<Interrupt, Out>(endpoint)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        let mut writer = ep.writer(data.len().max(64));
        writer
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        debug!(endpoint, len = data.len(), "interrupt write complete");
        Ok(data.len())
    }

    fn read_interrupt(
        &mut self,
        endpoint: u8,
        max_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let interface = self
            .interface
            .as_ref()
            .ok_or_else(|| TransportError::ReadFailed("interface not claimed".into()))?;

        let ep = interface
            .endpoint::<Interrupt, In>(endpoint)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;

        let mut reader = ep.reader(max_len.max(64));
        let mut buf = vec![0u8; max_len];
        let n = reader
            .read(&mut buf)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;
        buf.truncate(n);

        debug!(endpoint, bytes = n, "interrupt read complete");
        Ok(buf)
    }

    fn close(&mut self) {
        self.interface = None;
    }
}
