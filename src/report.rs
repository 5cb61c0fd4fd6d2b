//! Input report sent to the virtual device
//!
//! The field order matches the axis declaration order of the descriptor
//! (X, Y, Z, Rx, Ry, Rz), each a signed 16-bit little-endian value, so the
//! 16-bit Report Size of every axis item describes this layout exactly.

use crate::config::AxisLimits;
use crate::tracking::PoseSample;

/// Report length in bytes
pub const REPORT_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceReport {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub rx: i16,
    pub ry: i16,
    pub rz: i16,
}

impl DeviceReport {
    /// Map a pose onto the axes: roll → Rx, pitch → Ry, heading → Rz
    pub fn from_pose(pose: &PoseSample, limits: &AxisLimits) -> Self {
        Self {
            x: limits.x.clamp(pose.x),
            y: limits.y.clamp(pose.y),
            z: limits.z.clamp(pose.z),
            rx: limits.rx.clamp(pose.roll),
            ry: limits.ry.clamp(pose.pitch),
            rz: limits.rz.clamp(pose.heading),
        }
    }

    pub fn to_bytes(&self) -> [u8; REPORT_LENGTH] {
        let mut data = [0u8; REPORT_LENGTH];
        for (chunk, value) in data
            .chunks_exact_mut(2)
            .zip([self.x, self.y, self.z, self.rx, self.ry, self.rz])
        {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(heading: f32, pitch: f32, roll: f32, x: f32, y: f32, z: f32) -> PoseSample {
        PoseSample {
            heading,
            pitch,
            roll,
            x,
            y,
            z,
            counter: 1,
        }
    }

    #[test]
    fn test_report_layout() {
        let report = DeviceReport {
            x: 1,
            y: -1,
            z: 300,
            rx: -45,
            ry: 0x1234,
            rz: -130,
        };
        assert_eq!(
            report.to_bytes(),
            [0x01, 0x00, 0xff, 0xff, 0x2c, 0x01, 0xd3, 0xff, 0x34, 0x12, 0x7e, 0xff]
        );
    }

    #[test]
    fn test_from_pose_maps_rotations() {
        let limits = AxisLimits::default();
        let report = DeviceReport::from_pose(&pose(10.7, -20.2, 30.9, 1.0, 2.0, 3.0), &limits);
        assert_eq!(report.rz, 10);
        assert_eq!(report.ry, -20);
        assert_eq!(report.rx, 30);
        assert_eq!((report.x, report.y, report.z), (1, 2, 3));
    }

    #[test]
    fn test_from_pose_clamps() {
        let limits = AxisLimits::default();
        let report =
            DeviceReport::from_pose(&pose(-500.0, 500.0, -90.0, 1e6, -1e6, -5.0), &limits);
        assert_eq!(report.rz, -130);
        assert_eq!(report.ry, 80);
        assert_eq!(report.rx, -45);
        assert_eq!(report.x, 300);
        assert_eq!(report.y, -300);
        assert_eq!(report.z, 0);
    }
}
