use serde::{Deserialize, Serialize};

use crate::descriptor::{Axis, AxisSpec, ControlProfile};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Descriptor profile announced to the host
    pub profile: ControlProfile,
    /// Report cadence in milliseconds
    pub poll_interval_ms: u64,
    /// Descriptor buffer capacity in bytes
    pub descriptor_capacity: usize,
    /// Virtual HID device settings
    pub device: DeviceConfig,
    /// Pose source settings
    pub tracker: TrackerConfig,
    /// Axis ranges, shared by the descriptor and report clamping
    pub axes: AxisLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: ControlProfile::Joystick,
            poll_interval_ms: 100,
            descriptor_capacity: 1024,
            device: DeviceConfig::default(),
            tracker: TrackerConfig::default(),
            axes: AxisLimits::default(),
        }
    }
}

/// Virtual HID device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Product string, also used as the device name
    pub name: String,
    /// Serial number string
    pub serial_number: String,
    /// Manufacturer string
    pub manufacturer: String,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Gadget directory name under the ConfigFS root
    pub gadget_name: String,
    /// ConfigFS USB gadget root
    pub configfs_path: String,
    /// Directory listing USB Device Controllers
    pub udc_class_path: String,
    /// UDC to bind to (first available if unset)
    pub udc: Option<String>,
    /// HID character device created for the gadget function
    pub hid_device: String,
    /// How long to wait for the HID device node after binding
    pub device_wait_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "LinuxTrack Virtual Control".to_string(),
            serial_number: "SN 1911".to_string(),
            manufacturer: "hidtrack".to_string(),
            vendor_id: 0x0002,
            product_id: 0x0003,
            gadget_name: "hidtrack".to_string(),
            configfs_path: "/sys/kernel/config/usb_gadget".to_string(),
            udc_class_path: "/sys/class/udc".to_string(),
            udc: None,
            hid_device: "/dev/hidg0".to_string(),
            device_wait_ms: 2000,
        }
    }
}

/// Pose source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// UDP address the tracker sends poses to
    pub bind_address: String,
    /// How long to wait for the first pose at startup
    pub init_timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4242".to_string(),
            init_timeout_ms: 20_000,
        }
    }
}

/// Inclusive logical range of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i16,
    pub max: i16,
}

impl AxisRange {
    pub const fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }

    /// Clamp a pose value into the range, truncating toward zero
    pub fn clamp(&self, value: f32) -> i16 {
        if value.is_nan() {
            return 0i16.clamp(self.min, self.max);
        }
        value.clamp(f32::from(self.min), f32::from(self.max)) as i16
    }
}

/// Ranges for all six axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLimits {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    pub rx: AxisRange,
    pub ry: AxisRange,
    pub rz: AxisRange,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-300, 300),
            y: AxisRange::new(-300, 300),
            z: AxisRange::new(0, 300),
            rx: AxisRange::new(-45, 45),
            ry: AxisRange::new(-80, 80),
            rz: AxisRange::new(-130, 130),
        }
    }
}

impl AxisLimits {
    pub fn range(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::Rx => self.rx,
            Axis::Ry => self.ry,
            Axis::Rz => self.rz,
        }
    }

    /// Axis declarations in report field order
    pub fn specs(&self) -> Vec<AxisSpec> {
        Axis::ALL
            .iter()
            .map(|&axis| {
                let range = self.range(axis);
                AxisSpec::new(axis, range.min, range.max)
            })
            .collect()
    }
}
