//! Short-lived device sessions for kernel driver binding
//!
//! A [`Session`] is open for exactly as long as the value exists: `open` is
//! the only way to create one and `close` (or drop) is terminal. The
//! detach/reattach calls therefore cannot run on a closed handle, and a
//! failing call still closes the handle when the session leaves scope.

use crate::backend::{BackendDevice, KernelDriverHandle};
use crate::device::DeviceRef;
use crate::error::{Error, Operation, Result};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Which way to move an interface's kernel driver binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAction {
    /// Release the interface from its kernel driver
    Detach,
    /// Bind the kernel driver to the interface again
    Reattach,
}

impl DriverAction {
    fn operation(self) -> Operation {
        match self {
            DriverAction::Detach => Operation::DetachKernelDriver,
            DriverAction::Reattach => Operation::ReattachKernelDriver,
        }
    }
}

impl fmt::Display for DriverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverAction::Detach => f.write_str("detach"),
            DriverAction::Reattach => f.write_str("reattach"),
        }
    }
}

/// Open handle to one device
pub struct Session<'ctx, H: KernelDriverHandle> {
    handle: H,
    bus: u8,
    address: u8,
    _context: PhantomData<&'ctx ()>,
}

impl<'ctx, H: KernelDriverHandle> Session<'ctx, H> {
    /// Open `device`
    ///
    /// Fails when the OS refuses the handle (insufficient permissions, device
    /// busy, or unplugged since enumeration).
    pub fn open<D>(device: &DeviceRef<'ctx, D>) -> Result<Self>
    where
        D: BackendDevice<Handle = H>,
    {
        let bus = device.bus_number();
        let address = device.device_address();

        let handle = device.device().open().map_err(|e| {
            warn!("Failed to open device bus={} addr={}: {}", bus, address, e);
            Error::subsystem(Operation::Open, e)
        })?;

        debug!("Opened device bus={} addr={}", bus, address);

        Ok(Self {
            handle,
            bus,
            address,
            _context: PhantomData,
        })
    }

    pub fn detach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.apply(DriverAction::Detach, interface)
    }

    pub fn reattach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.apply(DriverAction::Reattach, interface)
    }

    /// Run one driver-binding action on `interface`
    ///
    /// The interface number is forwarded as is; range checks happen when the
    /// [`crate::AttachSpec`] is parsed.
    pub fn apply(&mut self, action: DriverAction, interface: u8) -> Result<()> {
        let result = match action {
            DriverAction::Detach => self.handle.detach_kernel_driver(interface),
            DriverAction::Reattach => self.handle.attach_kernel_driver(interface),
        };

        match result {
            Ok(()) => {
                info!(
                    "Kernel driver {} on interface {} of device bus={} addr={}",
                    past_tense(action),
                    interface,
                    self.bus,
                    self.address
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Failed to {} kernel driver on interface {} of device bus={} addr={}: {}",
                    action, interface, self.bus, self.address, e
                );
                Err(Error::subsystem(action.operation(), e))
            }
        }
    }

    /// Close the handle
    pub fn close(self) {
        drop(self);
    }
}

impl<H: KernelDriverHandle> Drop for Session<'_, H> {
    fn drop(&mut self) {
        debug!("Closed device bus={} addr={}", self.bus, self.address);
    }
}

fn past_tense(action: DriverAction) -> &'static str {
    match action {
        DriverAction::Detach => "detached",
        DriverAction::Reattach => "reattached",
    }
}
