//! Error types for device sessions and driver binding

use std::fmt;
use thiserror::Error;

/// The subsystem call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    ListDevices,
    Open,
    DetachKernelDriver,
    ReattachKernelDriver,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Initialize => "USB context initialization",
            Operation::ListDevices => "Device enumeration",
            Operation::Open => "Device open",
            Operation::DetachKernelDriver => "Kernel driver detach",
            Operation::ReattachKernelDriver => "Kernel driver reattach",
        };
        f.write_str(name)
    }
}

/// A user-supplied attach argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bus,
    Address,
    Interface,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Bus => "busID",
            Field::Address => "addressID",
            Field::Interface => "interfaceID",
        };
        f.write_str(name)
    }
}

/// Errors raised while selecting a device or toggling its kernel driver
#[derive(Debug, Error)]
pub enum Error {
    /// libusb reported a native failure
    #[error("{operation} failed: {name}")]
    Subsystem {
        operation: Operation,
        name: &'static str,
        #[source]
        source: rusb::Error,
    },

    /// One or more attach arguments were not an integer in 0..=255
    #[error("Invalid {}", join_fields(.fields))]
    Validation { fields: Vec<Field> },

    /// No enumerated device has the requested bus and address
    #[error("Device not found: bus={bus} addr={address}")]
    DeviceNotFound { bus: u8, address: u8 },
}

impl Error {
    pub(crate) fn subsystem(operation: Operation, source: rusb::Error) -> Self {
        Error::Subsystem {
            operation,
            name: error_name(source),
            source,
        }
    }

    /// The native error behind a subsystem failure
    pub fn native(&self) -> Option<rusb::Error> {
        match self {
            Error::Subsystem { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DeviceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Symbolic libusb name for a native error code
pub fn error_name(error: rusb::Error) -> &'static str {
    match error {
        rusb::Error::Io => "LIBUSB_ERROR_IO",
        rusb::Error::InvalidParam => "LIBUSB_ERROR_INVALID_PARAM",
        rusb::Error::Access => "LIBUSB_ERROR_ACCESS",
        rusb::Error::NoDevice => "LIBUSB_ERROR_NO_DEVICE",
        rusb::Error::NotFound => "LIBUSB_ERROR_NOT_FOUND",
        rusb::Error::Busy => "LIBUSB_ERROR_BUSY",
        rusb::Error::Timeout => "LIBUSB_ERROR_TIMEOUT",
        rusb::Error::Overflow => "LIBUSB_ERROR_OVERFLOW",
        rusb::Error::Pipe => "LIBUSB_ERROR_PIPE",
        rusb::Error::Interrupted => "LIBUSB_ERROR_INTERRUPTED",
        rusb::Error::NoMem => "LIBUSB_ERROR_NO_MEM",
        rusb::Error::NotSupported => "LIBUSB_ERROR_NOT_SUPPORTED",
        rusb::Error::BadDescriptor => "LIBUSB_ERROR_BAD_DESCRIPTOR",
        rusb::Error::Other => "LIBUSB_ERROR_OTHER",
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
