//! HID function of the USB gadget

use std::path::{Path, PathBuf};
use tracing::debug;

use super::configfs::{
    create_dir, create_symlink, remove_dir, remove_file, write_bytes, write_file, FsError,
};

/// HID function (hid.usbN) carrying a generated report descriptor
#[derive(Debug, Clone)]
pub struct HidFunction {
    /// Instance number (usb0, usb1, ...)
    instance: u8,
    /// Input report length in bytes
    report_length: usize,
    name: String,
}

impl HidFunction {
    pub fn new(instance: u8, report_length: usize) -> Self {
        Self {
            instance,
            report_length,
            name: format!("hid.usb{}", instance),
        }
    }

    /// Function name (e.g., "hid.usb0")
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    fn function_path(&self, gadget_path: &Path) -> PathBuf {
        gadget_path.join("functions").join(self.name())
    }

    /// Create the function directory and write its attributes
    pub fn create(&self, gadget_path: &Path, report_desc: &[u8]) -> Result<(), FsError> {
        let func_path = self.function_path(gadget_path);
        create_dir(&func_path)?;

        // No boot interface
        write_file(&func_path.join("protocol"), "0")?;
        write_file(&func_path.join("subclass"), "0")?;
        write_file(
            &func_path.join("report_length"),
            &self.report_length.to_string(),
        )?;
        write_bytes(&func_path.join("report_desc"), report_desc)?;

        debug!(
            "Created HID function: {} at {} ({} byte descriptor)",
            self.name(),
            func_path.display(),
            report_desc.len()
        );
        Ok(())
    }

    /// Link the function into a configuration
    pub fn link(&self, config_path: &Path, gadget_path: &Path) -> Result<(), FsError> {
        let func_path = self.function_path(gadget_path);
        let link_path = config_path.join(self.name());

        if link_path.symlink_metadata().is_err() {
            create_symlink(&func_path, &link_path)?;
            debug!("Linked HID function {} to config", self.name());
        }
        Ok(())
    }

    pub fn unlink(&self, config_path: &Path) -> Result<(), FsError> {
        remove_file(&config_path.join(self.name()))?;
        debug!("Unlinked HID function {}", self.name());
        Ok(())
    }

    pub fn cleanup(&self, gadget_path: &Path) -> Result<(), FsError> {
        remove_dir(&self.function_path(gadget_path))?;
        debug!("Cleaned up HID function {}", self.name());
        Ok(())
    }
}
