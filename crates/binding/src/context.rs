//! USB context lifecycle
//!
//! A [`Context`] owns the initialized USB subsystem. Every snapshot, device
//! reference and session borrows from it, so the borrow checker guarantees
//! the context is torn down last.

use crate::backend::UsbBackend;
use crate::device::{DeviceRef, DeviceSnapshot};
use crate::error::{Error, Operation, Result};
use tracing::{debug, info};

/// Initialized USB subsystem
pub struct Context<B: UsbBackend = rusb::Context> {
    backend: B,
}

impl Context<rusb::Context> {
    /// Initialize libusb for this process
    pub fn initialize() -> Result<Self> {
        let backend =
            rusb::Context::new().map_err(|e| Error::subsystem(Operation::Initialize, e))?;
        info!("USB context initialized");
        Ok(Self { backend })
    }
}

impl<B: UsbBackend> Context<B> {
    /// Wrap an already initialized backend
    pub fn with_backend(backend: B) -> Self {
        debug!("USB context created from backend");
        Self { backend }
    }

    /// Enumerate the devices attached right now
    ///
    /// An empty snapshot is a valid result; only a failing listing call is an
    /// error.
    pub fn list_devices(&self) -> Result<DeviceSnapshot<'_, B::Device>> {
        let devices = self
            .backend
            .devices()
            .map_err(|e| Error::subsystem(Operation::ListDevices, e))?;

        debug!("Enumerated {} devices", devices.len());

        Ok(DeviceSnapshot::new(
            devices.into_iter().map(DeviceRef::new).collect(),
        ))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Release the USB subsystem
    ///
    /// Dropping the context has the same effect; this only makes the end of
    /// its scope explicit at the call site.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<B: UsbBackend> Drop for Context<B> {
    fn drop(&mut self) {
        debug!("USB context shut down");
    }
}
