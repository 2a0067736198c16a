//! Command operations: listing devices and toggling a driver binding

use crate::attach::AttachSpec;
use crate::backend::BackendDevice;
use crate::device::DeviceSnapshot;
use crate::error::Result;
use crate::session::{DriverAction, Session};
use std::io::{self, Write};
use tracing::info;

/// Write one `Device: bus=.. port=.. addr=..` line per device, in snapshot order
pub fn list_devices<D, W>(snapshot: &DeviceSnapshot<'_, D>, out: &mut W) -> io::Result<()>
where
    D: BackendDevice,
    W: Write,
{
    for device in snapshot {
        writeln!(
            out,
            "Device: bus={} port={} addr={}",
            device.bus_number(),
            device.port_number(),
            device.device_address()
        )?;
    }
    Ok(())
}

/// Resolve `spec` in `snapshot` and run `action` on its interface
///
/// Nothing is opened unless the device resolves. The session is closed on
/// every path out of this function.
pub fn apply_driver_action<D>(
    snapshot: &DeviceSnapshot<'_, D>,
    spec: &AttachSpec,
    action: DriverAction,
) -> Result<()>
where
    D: BackendDevice,
{
    let device = snapshot.resolve(spec)?;

    info!(
        "Requesting kernel driver {} on bus={} addr={} interface={}",
        action,
        spec.bus(),
        spec.address(),
        spec.interface()
    );

    let mut session = Session::open(device)?;
    let result = session.apply(action, spec.interface());
    session.close();
    result
}
