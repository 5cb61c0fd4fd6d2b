//! Virtual HID device
//!
//! The bridge only talks to a [`VirtualDevice`]: register it with a report
//! descriptor, send fixed-size reports, unregister it on shutdown.
//! [`GadgetDevice`] implements it with the Linux USB gadget ConfigFS API:
//! ```text
//! /sys/kernel/config/usb_gadget/<gadget>
//!     ├── idVendor, idProduct, strings/0x409/...
//!     ├── functions/hid.usb0/report_desc   <- generated descriptor
//!     ├── configs/c.1/hid.usb0 -> functions/hid.usb0
//!     └── UDC                              <- bind
//! /dev/hidg0                               <- reports
//! ```

pub mod configfs;
pub mod function;
pub mod gadget;

pub use function::HidFunction;
pub use gadget::{wait_for_device, GadgetDevice};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DeviceConfig;
use crate::descriptor::ReportDescriptor;
use crate::report::DeviceReport;

/// Virtual device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Unable to access USB gadget driver: {0}")]
    DriverUnavailable(String),

    #[error("Unable to create HID device: {0}")]
    CreateFailed(String),

    #[error("Unable to destroy HID device: {0}")]
    DestroyFailed(String),

    #[error("Unable to send data to HID device: {reason} (code: {code})")]
    SendFailed { reason: String, code: &'static str },

    #[error("HID device is not registered")]
    NotRegistered,
}

impl DeviceError {
    /// Whether a later send may succeed without re-registering
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::SendFailed { code, .. } if *code == "eagain_retry" || *code == "eshutdown")
    }
}

/// Identity announced by the virtual device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub serial_number: String,
    pub manufacturer: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl From<&DeviceConfig> for DeviceIdentity {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            name: config.name.clone(),
            serial_number: config.serial_number.clone(),
            manufacturer: config.manufacturer.clone(),
            vendor_id: config.vendor_id,
            product_id: config.product_id,
        }
    }
}

/// A host-visible virtual HID device
#[async_trait]
pub trait VirtualDevice: Send {
    /// Backend name
    fn name(&self) -> &'static str;

    /// Create the device from a completed report descriptor
    async fn register(
        &mut self,
        identity: &DeviceIdentity,
        descriptor: &ReportDescriptor,
    ) -> Result<(), DeviceError>;

    /// Send one input report
    async fn send(&mut self, report: &DeviceReport) -> Result<(), DeviceError>;

    /// Remove the device
    async fn unregister(&mut self) -> Result<(), DeviceError>;
}
