//! Fixed-size chunk I/O over one claimed device interface.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::bus::traits::{TransportError, UsbDevice, UsbHandle};
use crate::protocol::{
    CHUNK_SIZE, DEBUG_ENDPOINT, DEBUG_INTERFACE, ENDPOINT, ENDPOINT_DIR_IN, INTERFACE,
};

/// Delay between retries when an interrupt read comes back empty; some
/// OS/driver combinations return empty reads without an error.
const EMPTY_READ_DELAY: Duration = Duration::from_millis(1);

/// Which logical channel of the device a handle is bound to. Fixed for
/// the lifetime of a [`ChunkHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceSelection {
    /// Primary communication interface.
    Normal,
    /// Secondary debug-link interface (protocol v1 only).
    Debug,
}

impl InterfaceSelection {
    pub fn interface_number(self) -> u8 {
        match self {
            Self::Normal => INTERFACE,
            Self::Debug => DEBUG_INTERFACE,
        }
    }

    pub fn endpoint(self) -> u8 {
        match self {
            Self::Normal => ENDPOINT,
            Self::Debug => DEBUG_ENDPOINT,
        }
    }
}

/// One open, interface-claimed connection moving raw 64-byte chunks.
///
/// Lifecycle: `Closed` (initial) → [`open`](Self::open) → `Open` →
/// [`close`](Self::close) → `Closed`. Reads and writes require the open
/// state; calling them on a closed handle is a programming error and
/// panics. Callers serialize chunk operations themselves and impose any
/// timeout policy from outside.
pub struct ChunkHandle<D: UsbDevice> {
    device: D,
    selection: InterfaceSelection,
    handle: Option<D::Handle>,
}

impl<D: UsbDevice> ChunkHandle<D> {
    pub fn new(device: D, selection: InterfaceSelection) -> Self {
        Self {
            device,
            selection,
            handle: None,
        }
    }

    pub fn selection(&self) -> InterfaceSelection {
        self.selection
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Open the device connection and claim the selected interface.
    pub fn open(&mut self) -> Result<(), TransportError> {
        let mut handle = self.device.open()?;
        handle.claim_interface(self.selection.interface_number())?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the claimed interface and close the connection. Idempotent;
    /// a no-op on an already-closed handle.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let _ = handle.release_interface(self.selection.interface_number());
            handle.close();
            debug!(
                interface = self.selection.interface_number(),
                "closed chunk handle"
            );
        }
    }

    /// Write exactly one 64-byte chunk.
    ///
    /// # Panics
    ///
    /// Panics if the handle is not open.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        let handle = self.handle.as_mut().expect("chunk handle is not open");
        if chunk.len() != CHUNK_SIZE {
            return Err(TransportError::ChunkSize {
                actual: chunk.len(),
                expected: CHUNK_SIZE,
            });
        }
        handle.write_interrupt(self.selection.endpoint(), chunk)?;
        Ok(())
    }

    /// Block until one full 64-byte chunk arrives.
    ///
    /// Empty reads are retried after a short delay with no built-in
    /// timeout; an unresponsive device blocks here until the caller
    /// intervenes. A non-empty read of any other length fails.
    ///
    /// # Panics
    ///
    /// Panics if the handle is not open.
    pub fn read_chunk(&mut self) -> Result<Vec<u8>, TransportError> {
        let handle = self.handle.as_mut().expect("chunk handle is not open");
        let endpoint = ENDPOINT_DIR_IN | self.selection.endpoint();
        loop {
            let chunk = handle.read_interrupt(endpoint, CHUNK_SIZE)?;
            if chunk.is_empty() {
                thread::sleep(EMPTY_READ_DELAY);
                continue;
            }
            if chunk.len() != CHUNK_SIZE {
                return Err(TransportError::ChunkSize {
                    actual: chunk.len(),
                    expected: CHUNK_SIZE,
                });
            }
            return Ok(chunk);
        }
    }
}

impl<D: UsbDevice> Drop for ChunkHandle<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockDevice;
    use std::time::Instant;

    fn open_handle(device: &MockDevice) -> ChunkHandle<MockDevice> {
        let mut handle = ChunkHandle::new(device.clone(), InterfaceSelection::Normal);
        handle.open().unwrap();
        handle
    }

    #[test]
    fn test_open_claims_selected_interface() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = ChunkHandle::new(device.clone(), InterfaceSelection::Debug);
        assert!(!handle.is_open());
        handle.open().unwrap();
        assert!(handle.is_open());
        assert_eq!(device.claimed_interfaces(), vec![DEBUG_INTERFACE]);
    }

    #[test]
    fn test_open_failure_is_typed() {
        let device = MockDevice::new(0x534C, 0x0001).failing_open();
        let mut handle = ChunkHandle::new(device, InterfaceSelection::Normal);
        assert!(matches!(
            handle.open(),
            Err(TransportError::DeviceOpen { .. })
        ));
        assert!(!handle.is_open());
    }

    #[test]
    fn test_write_chunk_rejects_wrong_sizes() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = open_handle(&device);

        for len in [0usize, 1, 63, 65, 128] {
            let err = handle.write_chunk(&vec![0u8; len]).unwrap_err();
            match err {
                TransportError::ChunkSize { actual, expected } => {
                    assert_eq!(actual, len);
                    assert_eq!(expected, CHUNK_SIZE);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(device.writes().is_empty());
    }

    #[test]
    fn test_write_chunk_hits_out_endpoint() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = open_handle(&device);
        handle.write_chunk(&[0xAB; CHUNK_SIZE]).unwrap();

        let writes = device.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, ENDPOINT);
        assert_eq!(writes[0].1, vec![0xAB; CHUNK_SIZE]);
    }

    #[test]
    #[should_panic(expected = "chunk handle is not open")]
    fn test_write_chunk_on_closed_handle_panics() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = ChunkHandle::new(device, InterfaceSelection::Normal);
        let _ = handle.write_chunk(&[0u8; CHUNK_SIZE]);
    }

    #[test]
    fn test_read_chunk_returns_full_chunk() {
        let device = MockDevice::new(0x534C, 0x0001);
        device.queue_read(&[0x5A; CHUNK_SIZE]);
        let mut handle = open_handle(&device);
        assert_eq!(handle.read_chunk().unwrap(), vec![0x5A; CHUNK_SIZE]);
    }

    #[test]
    fn test_read_chunk_rejects_short_read() {
        let device = MockDevice::new(0x534C, 0x0001);
        device.queue_read(&[0u8; 32]);
        let mut handle = open_handle(&device);
        assert!(matches!(
            handle.read_chunk(),
            Err(TransportError::ChunkSize {
                actual: 32,
                expected: CHUNK_SIZE,
            })
        ));
    }

    #[test]
    fn test_read_chunk_retries_empty_reads() {
        let device = MockDevice::new(0x534C, 0x0001);
        device.queue_empty_reads(3);
        device.queue_read(&[0x11; CHUNK_SIZE]);
        let mut handle = open_handle(&device);

        let start = Instant::now();
        let chunk = handle.read_chunk().unwrap();
        assert_eq!(chunk, vec![0x11; CHUNK_SIZE]);
        assert!(start.elapsed() >= 3 * EMPTY_READ_DELAY);
    }

    #[test]
    fn test_close_is_idempotent() {
        let device = MockDevice::new(0x534C, 0x0001);
        let mut handle = open_handle(&device);
        handle.close();
        handle.close();
        assert!(!handle.is_open());
        assert_eq!(device.released_interfaces(), vec![INTERFACE]);
        assert_eq!(device.close_count(), 1);
    }

    #[test]
    fn test_drop_closes_handle() {
        let device = MockDevice::new(0x534C, 0x0001);
        {
            let _handle = open_handle(&device);
        }
        assert_eq!(device.close_count(), 1);
    }
}
