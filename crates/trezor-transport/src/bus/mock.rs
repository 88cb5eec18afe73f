//! Mock bus driver for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{TransportError, UsbBus, UsbDevice, UsbHandle};
use crate::protocol::{CLASS_VENDOR_SPEC, INTERFACE};

/// Scripted outcome of the liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Ok,
    NotSupported,
    Fail,
}

/// Mock bus returning a fixed device list on every scan.
#[derive(Default)]
pub struct MockBus {
    devices: Vec<MockDevice>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self { devices }
    }

    pub fn push(&mut self, device: MockDevice) {
        self.devices.push(device);
    }
}

impl UsbBus for MockBus {
    type Device = MockDevice;

    fn devices(&self) -> Result<Vec<MockDevice>, TransportError> {
        Ok(self.devices.clone())
    }
}

/// Shared I/O state, visible to the test after handles are opened on the
/// device.
#[derive(Default)]
struct MockState {
    reads: Mutex<VecDeque<Vec<u8>>>,
    writes: Mutex<Vec<(u8, Vec<u8>)>>,
    claimed: Mutex<Vec<u8>>,
    released: Mutex<Vec<u8>>,
    closes: Mutex<usize>,
}

/// Mock device descriptor with builder-style setup.
#[derive(Clone)]
pub struct MockDevice {
    vendor_id: u16,
    product_id: u16,
    bus_number: u8,
    ports: Vec<u8>,
    interface_classes: Vec<(u8, u8)>,
    probe: Probe,
    fail_open: bool,
    state: Arc<MockState>,
}

impl MockDevice {
    /// A well-behaved device: vendor-class interface 0, probe succeeds.
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            bus_number: 0,
            ports: Vec::new(),
            interface_classes: vec![(INTERFACE, CLASS_VENDOR_SPEC)],
            probe: Probe::Ok,
            fail_open: false,
            state: Arc::new(MockState::default()),
        }
    }

    /// Place the device at a physical bus position.
    pub fn at(mut self, bus_number: u8, ports: &[u8]) -> Self {
        self.bus_number = bus_number;
        self.ports = ports.to_vec();
        self
    }

    /// Override the class of one interface.
    pub fn with_interface_class(mut self, interface: u8, class: u8) -> Self {
        self.interface_classes.retain(|(i, _)| *i != interface);
        self.interface_classes.push((interface, class));
        self
    }

    /// Make the liveness probe report the ghost-enumeration condition.
    pub fn probe_not_supported(mut self) -> Self {
        self.probe = Probe::NotSupported;
        self
    }

    /// Make the liveness probe fail with a genuine error.
    pub fn probe_failing(mut self) -> Self {
        self.probe = Probe::Fail;
        self
    }

    /// Make `open` fail as if permissions were missing.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Queue one interrupt read result. An empty slice simulates the
    /// empty-read driver quirk.
    pub fn queue_read(&self, chunk: &[u8]) {
        self.state.reads.lock().unwrap().push_back(chunk.to_vec());
    }

    /// Queue `n` empty reads.
    pub fn queue_empty_reads(&self, n: usize) {
        for _ in 0..n {
            self.queue_read(&[]);
        }
    }

    /// All captured interrupt writes as (endpoint, data).
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn claimed_interfaces(&self) -> Vec<u8> {
        self.state.claimed.lock().unwrap().clone()
    }

    pub fn released_interfaces(&self) -> Vec<u8> {
        self.state.released.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        *self.state.closes.lock().unwrap()
    }
}

impl UsbDevice for MockDevice {
    type Handle = MockHandle;

    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn bus_number(&self) -> u8 {
        self.bus_number
    }

    fn port_numbers(&self) -> Vec<u8> {
        self.ports.clone()
    }

    fn interface_class(&self, interface: u8) -> Option<u8> {
        self.interface_classes
            .iter()
            .find(|(i, _)| *i == interface)
            .map(|(_, class)| *class)
    }

    fn read_product_string(&self) -> Result<String, TransportError> {
        match self.probe {
            Probe::Ok => Ok("Mock Device".to_owned()),
            Probe::NotSupported => Err(TransportError::NotSupported),
            Probe::Fail => Err(TransportError::ReadFailed("probe failed".into())),
        }
    }

    fn open(&self) -> Result<MockHandle, TransportError> {
        if self.fail_open {
            return Err(TransportError::DeviceOpen {
                message: "access denied".into(),
            });
        }
        Ok(MockHandle {
            state: Arc::clone(&self.state),
        })
    }
}

/// Open handle routing I/O into the owning device's shared state.
pub struct MockHandle {
    state: Arc<MockState>,
}

impl UsbHandle for MockHandle {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.state.claimed.lock().unwrap().push(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.state.released.lock().unwrap().push(interface);
        Ok(())
    }

    fn write_interrupt(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError> {
        self.state
            .writes
            .lock()
            .unwrap()
            .push((endpoint, data.to_vec()));
        Ok(data.len())
    }

    fn read_interrupt(
        &mut self,
        _endpoint: u8,
        _max_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        // An exhausted queue is a test bug; erroring beats spinning forever
        // in the chunk retry loop.
        self.state
            .reads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::ReadFailed("no queued reads".into()))
    }

    fn close(&mut self) {
        *self.state.closes.lock().unwrap() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_write_capture() {
        let device = MockDevice::new(0x1209, 0x53C1);
        let mut handle = device.open().unwrap();
        handle.write_interrupt(1, b"hello").unwrap();
        handle.write_interrupt(1, b"world").unwrap();

        let writes = device.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], (1, b"hello".to_vec()));
        assert_eq!(writes[1], (1, b"world".to_vec()));
    }

    #[test]
    fn test_mock_read_queue() {
        let device = MockDevice::new(0x1209, 0x53C1);
        device.queue_read(b"abc");
        device.queue_read(&[]);

        let mut handle = device.open().unwrap();
        assert_eq!(handle.read_interrupt(0x81, 64).unwrap(), b"abc");
        assert!(handle.read_interrupt(0x81, 64).unwrap().is_empty());
        assert!(handle.read_interrupt(0x81, 64).is_err());
    }

    #[test]
    fn test_mock_claim_tracking() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = device.open().unwrap();
        handle.claim_interface(0).unwrap();
        handle.release_interface(0).unwrap();
        handle.close();

        assert_eq!(device.claimed_interfaces(), vec![0]);
        assert_eq!(device.released_interfaces(), vec![0]);
        assert_eq!(device.close_count(), 1);
    }

    #[test]
    fn test_mock_failing_open() {
        let device = MockDevice::new(0x534C, 0x0001).failing_open();
        assert!(matches!(
            device.open(),
            Err(TransportError::DeviceOpen { .. })
        ));
    }
}
