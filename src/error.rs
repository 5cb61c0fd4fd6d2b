use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::device::DeviceError;
use crate::tracking::TrackerError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("HID device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
