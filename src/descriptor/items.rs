//! HID report descriptor items and profile templates

use serde::{Deserialize, Serialize};

/// Usage Page (Generic Desktop)
pub const GENERIC_DESKTOP_PAGE: u8 = 0x01;
/// Usage Page (VR Controls)
pub const VR_CONTROLS_PAGE: u8 = 0x03;

/// Logical Minimum, 1-byte payload
pub const LOGICAL_MIN_8: u8 = 0x15;
/// Logical Minimum, 2-byte payload
pub const LOGICAL_MIN_16: u8 = 0x16;
/// Logical Maximum, 1-byte payload
pub const LOGICAL_MAX_8: u8 = 0x25;
/// Logical Maximum, 2-byte payload
pub const LOGICAL_MAX_16: u8 = 0x26;

/// End Collection
pub const END_COLLECTION: u8 = 0xC0;

/// Offset of the usage byte inside [`AXIS_HEADER`]
pub const AXIS_USAGE_OFFSET: usize = 3;

/// Joystick preamble
pub const JOYSTICK_PREAMBLE: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
];

/// Joystick closure (Physical + Application)
pub const JOYSTICK_CLOSURE: &[u8] = &[
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Head tracker preamble
pub const VR_PREAMBLE: &[u8] = &[
    0x05, 0x03, // Usage Page (VR Controls)
    0x09, 0x05, // Usage (Head Tracker)
    0xA1, 0x00, // Collection (Physical)
];

/// Head tracker closure
pub const VR_CLOSURE: &[u8] = &[
    0xC0, // End Collection
];

/// Axis header, the usage byte is replaced per axis
pub const AXIS_HEADER: &[u8] = &[
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
];

/// Axis footer: one 16-bit absolute value
pub const AXIS_FOOTER: &[u8] = &[
    0x75, 0x10, //     Report Size (16)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
];

/// Device profile announced by the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlProfile {
    /// Generic desktop game pad
    #[default]
    Joystick,
    /// VR controls head tracker
    Vr,
}

impl ControlProfile {
    /// Opening bytes for this profile
    pub fn preamble(&self) -> &'static [u8] {
        match self {
            ControlProfile::Joystick => JOYSTICK_PREAMBLE,
            ControlProfile::Vr => VR_PREAMBLE,
        }
    }

    /// Closing bytes, one End Collection per opened collection
    pub fn closure(&self) -> &'static [u8] {
        match self {
            ControlProfile::Joystick => JOYSTICK_CLOSURE,
            ControlProfile::Vr => VR_CLOSURE,
        }
    }

    /// Usage page written as the first item of the preamble
    pub fn usage_page(&self) -> u8 {
        match self {
            ControlProfile::Joystick => GENERIC_DESKTOP_PAGE,
            ControlProfile::Vr => VR_CONTROLS_PAGE,
        }
    }

    /// Recover the profile from a leading usage page byte
    pub fn from_usage_page(page: u8) -> Option<Self> {
        match page {
            GENERIC_DESKTOP_PAGE => Some(ControlProfile::Joystick),
            VR_CONTROLS_PAGE => Some(ControlProfile::Vr),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ControlProfile::Joystick => "Joystick",
            ControlProfile::Vr => "VR Head Tracker",
        }
    }
}

/// Generic Desktop axis usages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    X = 0x30,
    Y = 0x31,
    Z = 0x32,
    Rx = 0x33,
    Ry = 0x34,
    Rz = 0x35,
}

impl Axis {
    /// All axes in report field order
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::Rx, Axis::Ry, Axis::Rz];

    /// HID usage code
    pub fn usage(self) -> u8 {
        self as u8
    }
}

/// One declared axis with its logical range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub axis: Axis,
    pub minimum: i16,
    pub maximum: i16,
}

impl AxisSpec {
    pub fn new(axis: Axis, minimum: i16, maximum: i16) -> Self {
        Self {
            axis,
            minimum,
            maximum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_framing_is_balanced() {
        for profile in [ControlProfile::Joystick, ControlProfile::Vr] {
            let opened = profile
                .preamble()
                .chunks(2)
                .filter(|item| item[0] == 0xA1)
                .count();
            assert_eq!(opened, profile.closure().len());
            assert_eq!(profile.preamble()[1], profile.usage_page());
        }
    }

    #[test]
    fn test_profile_from_usage_page() {
        assert_eq!(
            ControlProfile::from_usage_page(0x01),
            Some(ControlProfile::Joystick)
        );
        assert_eq!(ControlProfile::from_usage_page(0x03), Some(ControlProfile::Vr));
        assert_eq!(ControlProfile::from_usage_page(0x02), None);
    }

    #[test]
    fn test_axis_usages() {
        let usages: Vec<u8> = Axis::ALL.iter().map(|a| a.usage()).collect();
        assert_eq!(usages, vec![0x30, 0x31, 0x32, 0x33, 0x34, 0x35]);
    }
}
