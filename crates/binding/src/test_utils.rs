//! Test utilities for the driver-binding core
//!
//! Provides an in-memory USB backend that records every subsystem call and
//! can be scripted to fail, so sessions and commands can be exercised without
//! real hardware or privileges.
//!
//! # Example
//!
//! ```
//! use binding::Context;
//! use binding::test_utils::{MockBackend, MockDevice};
//!
//! let device = MockDevice::new(1, 2, 4);
//! let context = Context::with_backend(MockBackend::with_devices(vec![device]));
//! let snapshot = context.list_devices().unwrap();
//! assert_eq!(snapshot.len(), 1);
//! ```

use crate::backend::{BackendDevice, KernelDriverHandle, UsbBackend};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A subsystem call observed by a [`MockDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Open,
    DetachKernelDriver(u8),
    AttachKernelDriver(u8),
    Close,
}

struct DeviceState {
    bus: u8,
    port: u8,
    address: u8,
    calls: RefCell<Vec<MockCall>>,
    open_error: Cell<Option<rusb::Error>>,
    detach_error: Cell<Option<rusb::Error>>,
    attach_error: Cell<Option<rusb::Error>>,
    open_handles: Cell<usize>,
    releases: Rc<Cell<usize>>,
}

impl Drop for DeviceState {
    fn drop(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}

/// Reference-counted fake device
///
/// Clones share one state, mirroring libusb's per-device reference count.
/// The state is released exactly once, when the last clone is dropped.
#[derive(Clone)]
pub struct MockDevice {
    state: Rc<DeviceState>,
}

impl MockDevice {
    pub fn new(bus: u8, port: u8, address: u8) -> Self {
        Self {
            state: Rc::new(DeviceState {
                bus,
                port,
                address,
                calls: RefCell::new(Vec::new()),
                open_error: Cell::new(None),
                detach_error: Cell::new(None),
                attach_error: Cell::new(None),
                open_handles: Cell::new(0),
                releases: Rc::new(Cell::new(0)),
            }),
        }
    }

    /// Make every following `open` fail with `error`
    pub fn fail_open(&self, error: rusb::Error) {
        self.state.open_error.set(Some(error));
    }

    pub fn fail_detach(&self, error: rusb::Error) {
        self.state.detach_error.set(Some(error));
    }

    pub fn fail_attach(&self, error: rusb::Error) {
        self.state.attach_error.set(Some(error));
    }

    /// Calls recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.calls.borrow().clone()
    }

    /// Number of handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.state.open_handles.get()
    }

    /// Number of live references to this device, including open handles
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.state)
    }

    /// Observe releases of the underlying device after all clones are gone
    pub fn release_probe(&self) -> ReleaseProbe {
        ReleaseProbe(Rc::clone(&self.state.releases))
    }

    fn record(&self, call: MockCall) {
        self.state.calls.borrow_mut().push(call);
    }
}

/// Counts how many times a device state has been freed
pub struct ReleaseProbe(Rc<Cell<usize>>);

impl ReleaseProbe {
    pub fn releases(&self) -> usize {
        self.0.get()
    }
}

impl BackendDevice for MockDevice {
    type Handle = MockHandle;

    fn bus_number(&self) -> u8 {
        self.state.bus
    }

    fn port_number(&self) -> u8 {
        self.state.port
    }

    fn address(&self) -> u8 {
        self.state.address
    }

    fn open(&self) -> rusb::Result<MockHandle> {
        self.record(MockCall::Open);
        if let Some(error) = self.state.open_error.get() {
            return Err(error);
        }
        self.state.open_handles.set(self.state.open_handles.get() + 1);
        Ok(MockHandle {
            device: self.clone(),
        })
    }
}

/// Open handle to a [`MockDevice`]; records `Close` when dropped
pub struct MockHandle {
    device: MockDevice,
}

impl KernelDriverHandle for MockHandle {
    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        self.device.record(MockCall::DetachKernelDriver(interface));
        match self.device.state.detach_error.get() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        self.device.record(MockCall::AttachKernelDriver(interface));
        match self.device.state.attach_error.get() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.device.record(MockCall::Close);
        let state = &self.device.state;
        state.open_handles.set(state.open_handles.get() - 1);
    }
}

/// In-memory USB subsystem
#[derive(Default)]
pub struct MockBackend {
    devices: RefCell<Vec<MockDevice>>,
    listing_error: Cell<Option<rusb::Error>>,
    listings: Cell<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let backend = Self::new();
        *backend.devices.borrow_mut() = devices;
        backend
    }

    pub fn add_device(&self, device: MockDevice) {
        self.devices.borrow_mut().push(device);
    }

    /// Make every following listing call fail with `error`
    pub fn fail_listing(&self, error: rusb::Error) {
        self.listing_error.set(Some(error));
    }

    /// Number of listing calls made so far
    pub fn listings(&self) -> usize {
        self.listings.get()
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDevice;

    fn devices(&self) -> rusb::Result<Vec<MockDevice>> {
        self.listings.set(self.listings.get() + 1);
        if let Some(error) = self.listing_error.get() {
            return Err(error);
        }
        Ok(self.devices.borrow().clone())
    }
}
