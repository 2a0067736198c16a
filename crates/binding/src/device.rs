//! Device references and enumeration snapshots

use crate::attach::AttachSpec;
use crate::backend::BackendDevice;
use crate::error::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Shared-ownership reference to one physical device
///
/// Cloning shares the backend's reference count; the device is released when
/// the last clone is dropped. The `'ctx` lifetime keeps every reference inside
/// the scope of the [`crate::Context`] that enumerated it.
#[derive(Clone)]
pub struct DeviceRef<'ctx, D: BackendDevice> {
    device: D,
    _context: PhantomData<&'ctx ()>,
}

impl<'ctx, D: BackendDevice> DeviceRef<'ctx, D> {
    pub(crate) fn new(device: D) -> Self {
        Self {
            device,
            _context: PhantomData,
        }
    }

    pub fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    pub fn port_number(&self) -> u8 {
        self.device.port_number()
    }

    pub fn device_address(&self) -> u8 {
        self.device.address()
    }

    /// Underlying backend device
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: BackendDevice> fmt::Debug for DeviceRef<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRef")
            .field("bus", &self.bus_number())
            .field("port", &self.port_number())
            .field("address", &self.device_address())
            .finish()
    }
}

/// Devices attached at the moment of one enumeration call, in enumeration order
///
/// The snapshot may already be stale when it is returned; nothing here
/// tracks unplug events.
pub struct DeviceSnapshot<'ctx, D: BackendDevice> {
    devices: Vec<DeviceRef<'ctx, D>>,
}

impl<'ctx, D: BackendDevice> DeviceSnapshot<'ctx, D> {
    pub(crate) fn new(devices: Vec<DeviceRef<'ctx, D>>) -> Self {
        Self { devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRef<'ctx, D>> {
        self.devices.iter()
    }

    /// Select the first device matching `spec` in enumeration order
    ///
    /// Duplicate bus/address pairs are not expected, but if present the
    /// earliest one wins.
    pub fn resolve(&self, spec: &AttachSpec) -> Result<&DeviceRef<'ctx, D>> {
        match self.devices.iter().find(|device| spec.matches(device)) {
            Some(device) => {
                debug!(
                    "Resolved bus={} addr={} to device at port {}",
                    spec.bus(),
                    spec.address(),
                    device.port_number()
                );
                Ok(device)
            }
            None => {
                debug!(
                    "No device at bus={} addr={} among {} enumerated",
                    spec.bus(),
                    spec.address(),
                    self.devices.len()
                );
                Err(Error::DeviceNotFound {
                    bus: spec.bus(),
                    address: spec.address(),
                })
            }
        }
    }
}

impl<'a, 'ctx, D: BackendDevice> IntoIterator for &'a DeviceSnapshot<'ctx, D> {
    type Item = &'a DeviceRef<'ctx, D>;
    type IntoIter = std::slice::Iter<'a, DeviceRef<'ctx, D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

impl<D: BackendDevice> fmt::Debug for DeviceSnapshot<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.devices.iter()).finish()
    }
}
