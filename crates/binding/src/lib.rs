//! USB device sessions and kernel driver binding
//!
//! This crate enumerates attached USB devices, selects one by bus number and
//! device address, and detaches or reattaches the kernel driver bound to one
//! of its interfaces so the interface can be claimed from user space.
//!
//! The flow for one invocation is:
//!
//! 1. [`Context::initialize`] sets up libusb.
//! 2. [`Context::list_devices`] takes a [`DeviceSnapshot`].
//! 3. [`AttachSpec::parse`] validates the bus/address/interface arguments.
//! 4. [`apply_driver_action`] resolves the device, opens a [`Session`],
//!    performs the [`DriverAction`] and closes the session.
//!
//! Every device reference and session borrows from the context, so teardown
//! order is enforced by the compiler.

pub mod attach;
pub mod backend;
pub mod context;
pub mod device;
pub mod error;
pub mod ops;
pub mod session;
pub mod test_utils;

pub use attach::AttachSpec;
pub use backend::{BackendDevice, KernelDriverHandle, UsbBackend};
pub use context::Context;
pub use device::{DeviceRef, DeviceSnapshot};
pub use error::{Error, Field, Operation, Result, error_name};
pub use ops::{apply_driver_action, list_devices};
pub use session::{DriverAction, Session};
