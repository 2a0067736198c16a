//! Common utilities for usbrelease
//!
//! Shared error handling and logging setup used by the command-line front end.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::setup_logging;
