//! hidtrack - head tracker to virtual USB HID device bridge
//!
//! This crate builds HID report descriptors for a joystick or a VR head
//! tracker, registers a matching virtual device on a Linux USB gadget, and
//! forwards head tracking poses to it as input reports.

pub mod bridge;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod report;
pub mod tracking;
pub mod utils;

pub use error::{AppError, Result};
