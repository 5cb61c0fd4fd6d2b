//! USB gadget backed virtual HID device

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use super::configfs::{
    create_dir, find_udc, read_file, remove_dir, write_file, FsError, USB_BCD_DEVICE, USB_BCD_USB,
};
use super::function::HidFunction;
use super::{DeviceError, DeviceIdentity, VirtualDevice};
use crate::config::DeviceConfig;
use crate::descriptor::ReportDescriptor;
use crate::report::{DeviceReport, REPORT_LENGTH};

/// Consecutive EAGAIN writes before the device counts as gone
const EAGAIN_OFFLINE_THRESHOLD: u8 = 3;

/// Virtual HID device on a Linux USB gadget
pub struct GadgetDevice {
    configfs_root: PathBuf,
    gadget_path: PathBuf,
    config_path: PathBuf,
    udc_class_path: PathBuf,
    /// Configured UDC, first found when `None`
    udc: Option<String>,
    hid_device: PathBuf,
    device_wait: Duration,
    function: HidFunction,
    bound_udc: Option<String>,
    dev: Option<File>,
    eagain_count: u8,
    created_by_us: bool,
}

impl GadgetDevice {
    pub fn new(config: &DeviceConfig) -> Self {
        let configfs_root = PathBuf::from(&config.configfs_path);
        let gadget_path = configfs_root.join(&config.gadget_name);
        let config_path = gadget_path.join("configs/c.1");

        Self {
            configfs_root,
            gadget_path,
            config_path,
            udc_class_path: PathBuf::from(&config.udc_class_path),
            udc: config.udc.clone(),
            hid_device: PathBuf::from(&config.hid_device),
            device_wait: Duration::from_millis(config.device_wait_ms),
            function: HidFunction::new(0, REPORT_LENGTH),
            bound_udc: None,
            dev: None,
            eagain_count: 0,
            created_by_us: false,
        }
    }

    pub fn gadget_path(&self) -> &Path {
        &self.gadget_path
    }

    pub fn gadget_exists(&self) -> bool {
        self.gadget_path.exists()
    }

    /// Check if the gadget is bound to a UDC
    pub fn is_bound(&self) -> bool {
        read_file(&self.gadget_path.join("UDC"))
            .map(|udc| !udc.is_empty())
            .unwrap_or(false)
    }

    pub fn bound_udc(&self) -> Option<&str> {
        self.bound_udc.as_deref()
    }

    fn resolve_udc(&self) -> Result<String, DeviceError> {
        match &self.udc {
            Some(udc) => Ok(udc.clone()),
            None => find_udc(&self.udc_class_path).ok_or_else(|| {
                DeviceError::DriverUnavailable(format!(
                    "No USB Device Controller (UDC) found in {}",
                    self.udc_class_path.display()
                ))
            }),
        }
    }

    /// Build the gadget tree and bind it
    fn create(
        &mut self,
        identity: &DeviceIdentity,
        descriptor: &ReportDescriptor,
        udc: &str,
    ) -> Result<(), FsError> {
        create_dir(&self.gadget_path)?;
        self.created_by_us = true;

        self.set_device_descriptors(identity)?;
        self.create_strings(identity)?;
        self.create_configuration()?;

        self.function.create(&self.gadget_path, descriptor.as_bytes())?;
        self.function.link(&self.config_path, &self.gadget_path)?;

        let udc_path = self.gadget_path.join("UDC");
        if self.is_bound() {
            // The kernel refuses to rebind a bound gadget
            return Err(FsError {
                action: "bind",
                path: udc_path,
                source: std::io::Error::from_raw_os_error(libc::EBUSY),
            });
        }

        info!("Binding gadget to UDC: {}", udc);
        write_file(&udc_path, udc)?;
        self.bound_udc = Some(udc.to_string());
        Ok(())
    }

    /// Unbind and tear down the gadget tree
    ///
    /// Only a failed unbind is an error; leftovers are logged.
    fn destroy(&mut self) -> Result<(), FsError> {
        self.dev = None;
        if !self.gadget_exists() {
            return Ok(());
        }

        info!("Cleaning up USB gadget: {}", self.gadget_path.display());

        if self.is_bound() {
            write_file(&self.gadget_path.join("UDC"), "")?;
            info!("Unbound gadget from UDC");
        }
        self.bound_udc = None;

        let _ = self.function.unlink(&self.config_path);
        let _ = remove_dir(&self.config_path.join("strings/0x409"));
        let _ = remove_dir(&self.config_path);
        let _ = self.function.cleanup(&self.gadget_path);
        let _ = remove_dir(&self.gadget_path.join("strings/0x409"));

        if let Err(e) = remove_dir(&self.gadget_path) {
            warn!("Could not remove gadget directory: {}", e);
        }

        self.created_by_us = false;
        Ok(())
    }

    fn set_device_descriptors(&self, identity: &DeviceIdentity) -> Result<(), FsError> {
        write_file(
            &self.gadget_path.join("idVendor"),
            &format!("0x{:04x}", identity.vendor_id),
        )?;
        write_file(
            &self.gadget_path.join("idProduct"),
            &format!("0x{:04x}", identity.product_id),
        )?;
        write_file(
            &self.gadget_path.join("bcdDevice"),
            &format!("0x{:04x}", USB_BCD_DEVICE),
        )?;
        write_file(
            &self.gadget_path.join("bcdUSB"),
            &format!("0x{:04x}", USB_BCD_USB),
        )?;
        debug!("Set device descriptors");
        Ok(())
    }

    fn create_strings(&self, identity: &DeviceIdentity) -> Result<(), FsError> {
        let strings_path = self.gadget_path.join("strings/0x409");
        create_dir(&strings_path)?;

        write_file(&strings_path.join("serialnumber"), &identity.serial_number)?;
        write_file(&strings_path.join("manufacturer"), &identity.manufacturer)?;
        write_file(&strings_path.join("product"), &identity.name)?;
        debug!("Created USB strings");
        Ok(())
    }

    fn create_configuration(&self) -> Result<(), FsError> {
        create_dir(&self.config_path)?;

        let strings_path = self.config_path.join("strings/0x409");
        create_dir(&strings_path)?;
        write_file(&strings_path.join("configuration"), "Config 1: HID")?;
        write_file(&self.config_path.join("MaxPower"), "100")?;

        debug!("Created configuration c.1");
        Ok(())
    }

    fn open_device(path: &Path) -> Result<File, DeviceError> {
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| Self::io_error_to_send_failed(e, "Failed to open HID device"))
    }

    fn io_error_to_send_failed(e: std::io::Error, operation: &str) -> DeviceError {
        let code = match e.raw_os_error() {
            Some(libc::EPIPE) => "epipe",
            Some(libc::ESHUTDOWN) => "eshutdown",
            Some(libc::EAGAIN) => "eagain",
            Some(libc::ENXIO) => "enxio",
            Some(libc::ENODEV) => "enodev",
            Some(libc::EIO) => "eio",
            Some(libc::ENOENT) => "enoent",
            _ => "io_error",
        };

        DeviceError::SendFailed {
            reason: format!("{}: {}", operation, e),
            code,
        }
    }
}

#[async_trait]
impl VirtualDevice for GadgetDevice {
    fn name(&self) -> &'static str {
        "gadget"
    }

    async fn register(
        &mut self,
        identity: &DeviceIdentity,
        descriptor: &ReportDescriptor,
    ) -> Result<(), DeviceError> {
        info!(
            "Registering {} '{}' ({})",
            descriptor.profile().description(),
            identity.name,
            identity.serial_number
        );

        if !self.configfs_root.exists() {
            return Err(DeviceError::DriverUnavailable(format!(
                "ConfigFS not available at {}",
                self.configfs_root.display()
            )));
        }
        let udc = self.resolve_udc()?;

        if let Err(first) = self.create(identity, descriptor, &udc) {
            // A previous instance may still hold the gadget
            warn!("Failed to create gadget ({}), recreating", first);
            if let Err(e) = self.destroy() {
                error!("Failed to remove existing gadget: {}", e);
                return Err(DeviceError::CreateFailed(first.to_string()));
            }
            self.create(identity, descriptor, &udc)
                .map_err(|e| DeviceError::CreateFailed(e.to_string()))?;
        }

        if !wait_for_device(&self.hid_device, self.device_wait).await {
            return Err(DeviceError::CreateFailed(format!(
                "HID device {} did not appear",
                self.hid_device.display()
            )));
        }

        info!("HID device ready at {}", self.hid_device.display());
        Ok(())
    }

    async fn send(&mut self, report: &DeviceReport) -> Result<(), DeviceError> {
        if self.bound_udc.is_none() {
            return Err(DeviceError::NotRegistered);
        }

        if self.dev.is_none() {
            let file = Self::open_device(&self.hid_device)?;
            debug!("Opened HID device: {}", self.hid_device.display());
            self.dev = Some(file);
        }

        let data = report.to_bytes();
        let result = match self.dev.as_mut() {
            Some(file) => file.write_all(&data),
            None => return Err(DeviceError::NotRegistered),
        };

        match result {
            Ok(()) => {
                self.eagain_count = 0;
                trace!("Sent report: {:02X?}", data);
                Ok(())
            }
            Err(e) => match e.raw_os_error() {
                Some(libc::ESHUTDOWN) => {
                    // Endpoint closed, reopen on the next send
                    self.eagain_count = 0;
                    self.dev = None;
                    debug!("HID device ESHUTDOWN, closing for recovery");
                    Err(Self::io_error_to_send_failed(e, "Failed to write report"))
                }
                Some(libc::EAGAIN) => {
                    self.eagain_count = self.eagain_count.saturating_add(1);
                    if self.eagain_count >= EAGAIN_OFFLINE_THRESHOLD {
                        Err(DeviceError::SendFailed {
                            reason: format!(
                                "Device busy ({} consecutive EAGAIN)",
                                self.eagain_count
                            ),
                            code: "eagain",
                        })
                    } else {
                        Err(DeviceError::SendFailed {
                            reason: "Device temporarily busy".to_string(),
                            code: "eagain_retry",
                        })
                    }
                }
                _ => {
                    self.eagain_count = 0;
                    Err(Self::io_error_to_send_failed(e, "Failed to write report"))
                }
            },
        }
    }

    async fn unregister(&mut self) -> Result<(), DeviceError> {
        if !self.gadget_exists() {
            return Err(DeviceError::DestroyFailed(format!(
                "gadget {} does not exist",
                self.gadget_path.display()
            )));
        }
        self.destroy()
            .map_err(|e| DeviceError::DestroyFailed(e.to_string()))?;
        info!("HID device removed");
        Ok(())
    }
}

impl Drop for GadgetDevice {
    fn drop(&mut self) {
        if self.created_by_us {
            if let Err(e) = self.destroy() {
                error!("Failed to cleanup USB gadget on drop: {}", e);
            }
        }
    }
}

/// Wait for the HID device node to appear
///
/// Polls with exponential backoff from 10ms, capped at 100ms.
pub async fn wait_for_device(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    let mut delay_ms = 10u64;
    const MAX_DELAY_MS: u64 = 100;

    loop {
        if path.exists() {
            return true;
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        let sleep_duration = Duration::from_millis(delay_ms).min(remaining);
        if sleep_duration.is_zero() {
            return false;
        }

        tokio::time::sleep(sleep_duration).await;
        delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Axis, AxisSpec, ControlProfile};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        config: DeviceConfig,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let configfs = dir.path().join("usb_gadget");
        let udc_class = dir.path().join("udc");
        fs::create_dir_all(&configfs).unwrap();
        fs::create_dir_all(udc_class.join("dummy_udc.0")).unwrap();
        let hid_device = dir.path().join("hidg0");
        fs::write(&hid_device, b"").unwrap();

        let config = DeviceConfig {
            configfs_path: configfs.to_string_lossy().to_string(),
            udc_class_path: udc_class.to_string_lossy().to_string(),
            hid_device: hid_device.to_string_lossy().to_string(),
            device_wait_ms: 50,
            ..DeviceConfig::default()
        };
        Fixture { _dir: dir, config }
    }

    fn descriptor() -> ReportDescriptor {
        let axes = [
            AxisSpec::new(Axis::X, -127, 127),
            AxisSpec::new(Axis::Y, -79, 79),
            AxisSpec::new(Axis::Z, -45, 45),
        ];
        ReportDescriptor::build(ControlProfile::Joystick, &axes, 1024).unwrap()
    }

    #[tokio::test]
    async fn test_register_writes_gadget_tree() {
        let fx = fixture();
        let mut device = GadgetDevice::new(&fx.config);
        let identity = DeviceIdentity::from(&fx.config);
        let desc = descriptor();

        device.register(&identity, &desc).await.unwrap();

        let gadget = device.gadget_path().to_path_buf();
        assert_eq!(read_file(&gadget.join("idVendor")).unwrap(), "0x0002");
        assert_eq!(read_file(&gadget.join("idProduct")).unwrap(), "0x0003");
        assert_eq!(
            read_file(&gadget.join("strings/0x409/serialnumber")).unwrap(),
            "SN 1911"
        );
        assert_eq!(
            read_file(&gadget.join("strings/0x409/product")).unwrap(),
            "LinuxTrack Virtual Control"
        );
        assert_eq!(
            fs::read(gadget.join("functions/hid.usb0/report_desc")).unwrap(),
            desc.as_bytes()
        );
        assert_eq!(
            read_file(&gadget.join("functions/hid.usb0/report_length")).unwrap(),
            "12"
        );
        assert!(device.is_bound());
        assert_eq!(device.bound_udc(), Some("dummy_udc.0"));
    }

    #[tokio::test]
    async fn test_send_writes_reports() {
        let fx = fixture();
        let mut device = GadgetDevice::new(&fx.config);
        device
            .register(&DeviceIdentity::from(&fx.config), &descriptor())
            .await
            .unwrap();

        let report = DeviceReport {
            x: 1,
            y: -1,
            z: 300,
            rx: 0,
            ry: 0,
            rz: -130,
        };
        device.send(&report).await.unwrap();
        device.send(&DeviceReport::default()).await.unwrap();

        let written = fs::read(&fx.config.hid_device).unwrap();
        assert_eq!(written.len(), 2 * REPORT_LENGTH);
        assert_eq!(&written[..REPORT_LENGTH], &report.to_bytes());
    }

    #[tokio::test]
    async fn test_unregister_unbinds() {
        let fx = fixture();
        let mut device = GadgetDevice::new(&fx.config);
        device
            .register(&DeviceIdentity::from(&fx.config), &descriptor())
            .await
            .unwrap();

        device.unregister().await.unwrap();
        assert!(!device.is_bound());
        assert_eq!(device.bound_udc(), None);
        assert_eq!(
            device.send(&DeviceReport::default()).await,
            Err(DeviceError::NotRegistered)
        );
    }

    /// Gadget tree left behind by a previous instance
    fn stale_gadget(fx: &Fixture) -> PathBuf {
        let gadget = Path::new(&fx.config.configfs_path).join(&fx.config.gadget_name);
        fs::create_dir_all(&gadget).unwrap();
        gadget
    }

    #[tokio::test]
    async fn test_register_recreates_bound_gadget() {
        let fx = fixture();
        let gadget = stale_gadget(&fx);
        fs::write(gadget.join("UDC"), "dummy_udc.0\n").unwrap();

        let mut device = GadgetDevice::new(&fx.config);
        let desc = descriptor();
        device
            .register(&DeviceIdentity::from(&fx.config), &desc)
            .await
            .unwrap();

        assert!(device.is_bound());
        assert_eq!(device.bound_udc(), Some("dummy_udc.0"));
        assert_eq!(
            fs::read(gadget.join("functions/hid.usb0/report_desc")).unwrap(),
            desc.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_register_fails_when_recreate_fails() {
        let fx = fixture();
        let gadget = stale_gadget(&fx);
        // Not writable as a file on either attempt
        fs::create_dir_all(gadget.join("functions/hid.usb0/report_desc")).unwrap();

        let mut device = GadgetDevice::new(&fx.config);
        let err = device
            .register(&DeviceIdentity::from(&fx.config), &descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, DeviceError::CreateFailed(_)));
        assert_eq!(device.bound_udc(), None);
        assert!(!device.is_bound());
    }

    #[tokio::test]
    async fn test_register_fails_when_unbind_fails() {
        // A readable attribute that refuses writes
        let readonly = Path::new("/proc/version");
        if !readonly.exists() {
            return;
        }

        let fx = fixture();
        let gadget = stale_gadget(&fx);
        std::os::unix::fs::symlink(readonly, gadget.join("UDC")).unwrap();

        let mut device = GadgetDevice::new(&fx.config);
        let err = device
            .register(&DeviceIdentity::from(&fx.config), &descriptor())
            .await
            .unwrap_err();

        match err {
            DeviceError::CreateFailed(reason) => assert!(reason.contains("bind"), "{}", reason),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(device.bound_udc(), None);
    }

    #[tokio::test]
    async fn test_send_before_register() {
        let fx = fixture();
        let mut device = GadgetDevice::new(&fx.config);
        assert_eq!(
            device.send(&DeviceReport::default()).await,
            Err(DeviceError::NotRegistered)
        );
    }

    #[tokio::test]
    async fn test_missing_configfs() {
        let fx = fixture();
        let config = DeviceConfig {
            configfs_path: "/nonexistent/usb_gadget".to_string(),
            ..fx.config.clone()
        };
        let mut device = GadgetDevice::new(&config);
        let err = device
            .register(&DeviceIdentity::from(&config), &descriptor())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::DriverUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_udc() {
        let fx = fixture();
        let config = DeviceConfig {
            udc_class_path: "/nonexistent/udc".to_string(),
            ..fx.config.clone()
        };
        let mut device = GadgetDevice::new(&config);
        let err = device
            .register(&DeviceIdentity::from(&config), &descriptor())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::DriverUnavailable(_)));
    }

    #[tokio::test]
    async fn test_device_node_timeout() {
        let fx = fixture();
        let config = DeviceConfig {
            hid_device: "/nonexistent/hidg7".to_string(),
            ..fx.config.clone()
        };
        let mut device = GadgetDevice::new(&config);
        let err = device
            .register(&DeviceIdentity::from(&config), &descriptor())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::CreateFailed(_)));
    }

    #[tokio::test]
    async fn test_unregister_without_gadget() {
        let fx = fixture();
        let mut device = GadgetDevice::new(&fx.config);
        assert!(matches!(
            device.unregister().await,
            Err(DeviceError::DestroyFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_for_device() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hidg0");
        assert!(!wait_for_device(&path, Duration::from_millis(30)).await);
        fs::write(&path, b"").unwrap();
        assert!(wait_for_device(&path, Duration::from_millis(30)).await);
    }
}
