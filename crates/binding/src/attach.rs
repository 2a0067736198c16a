//! Device selection from user-supplied bus, address and interface numbers

use crate::backend::BackendDevice;
use crate::device::DeviceRef;
use crate::error::{Error, Field, Result};

/// Validated (bus, address, interface) triple
///
/// Once constructed every field is a valid 8-bit value. Only bus and address
/// take part in device matching; the interface number is used when the
/// session toggles the kernel driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachSpec {
    bus: u8,
    address: u8,
    interface: u8,
}

impl AttachSpec {
    pub fn new(bus: u8, address: u8, interface: u8) -> Self {
        Self {
            bus,
            address,
            interface,
        }
    }

    /// Parse the three command arguments
    ///
    /// Each argument is checked on its own; the error lists every field that
    /// failed, in bus, address, interface order.
    pub fn parse(bus: &str, address: &str, interface: &str) -> Result<Self> {
        let bus = parse_field(bus);
        let address = parse_field(address);
        let interface = parse_field(interface);

        match (bus, address, interface) {
            (Some(bus), Some(address), Some(interface)) => Ok(Self::new(bus, address, interface)),
            (bus, address, interface) => {
                let fields = [
                    (bus.is_none(), Field::Bus),
                    (address.is_none(), Field::Address),
                    (interface.is_none(), Field::Interface),
                ]
                .into_iter()
                .filter_map(|(invalid, field)| invalid.then_some(field))
                .collect();
                Err(Error::Validation { fields })
            }
        }
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    /// True when the device sits at this bus and address
    pub fn matches<D: BackendDevice>(&self, device: &DeviceRef<'_, D>) -> bool {
        device.bus_number() == self.bus && device.device_address() == self.address
    }
}

/// Base-10 integer in 0..=255, surrounding whitespace ignored
fn parse_field(text: &str) -> Option<u8> {
    let value: i64 = text.trim().parse().ok()?;
    u8::try_from(value).ok()
}
