//! USB backend abstraction
//!
//! The driver-binding core only needs a handful of libusb calls: one device
//! listing, three per-device address accessors, open, and the two kernel
//! driver toggles. They are expressed as traits so the core can run against
//! `rusb` in production and against [`crate::test_utils::MockBackend`] in tests.

use rusb::UsbContext;

/// Process-wide USB subsystem state capable of listing attached devices
pub trait UsbBackend {
    type Device: BackendDevice;

    /// Take one enumeration snapshot of the attached devices
    fn devices(&self) -> rusb::Result<Vec<Self::Device>>;
}

/// A reference-counted handle to one physical device
///
/// `Clone` must share the underlying reference count, and dropping the last
/// clone must release the device exactly once.
pub trait BackendDevice: Clone {
    type Handle: KernelDriverHandle;

    fn bus_number(&self) -> u8;
    fn port_number(&self) -> u8;
    fn address(&self) -> u8;

    /// Open a handle to the device; dropping the handle closes it
    fn open(&self) -> rusb::Result<Self::Handle>;
}

/// An open device handle that can toggle kernel driver binding
pub trait KernelDriverHandle {
    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
}

impl UsbBackend for rusb::Context {
    type Device = rusb::Device<rusb::Context>;

    fn devices(&self) -> rusb::Result<Vec<Self::Device>> {
        let list = UsbContext::devices(self)?;
        Ok(list.iter().collect())
    }
}

impl<T: UsbContext> BackendDevice for rusb::Device<T> {
    type Handle = rusb::DeviceHandle<T>;

    fn bus_number(&self) -> u8 {
        rusb::Device::bus_number(self)
    }

    fn port_number(&self) -> u8 {
        rusb::Device::port_number(self)
    }

    fn address(&self) -> u8 {
        rusb::Device::address(self)
    }

    fn open(&self) -> rusb::Result<Self::Handle> {
        rusb::Device::open(self)
    }
}

impl<T: UsbContext> KernelDriverHandle for rusb::DeviceHandle<T> {
    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        rusb::DeviceHandle::detach_kernel_driver(self, interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        rusb::DeviceHandle::attach_kernel_driver(self, interface)
    }
}
