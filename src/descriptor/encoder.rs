//! Logical range encoding
//!
//! Each limit is written with the narrowest signed payload that holds it:
//! one byte for `-128..=127`, two little-endian bytes otherwise. Minimum and
//! maximum are encoded independently, so an axis may mix widths.

use super::items::{LOGICAL_MAX_16, LOGICAL_MAX_8, LOGICAL_MIN_16, LOGICAL_MIN_8};

/// Which end of the logical range an item declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Minimum,
    Maximum,
}

impl LimitKind {
    fn tags(self) -> (u8, u8) {
        match self {
            LimitKind::Minimum => (LOGICAL_MIN_8, LOGICAL_MIN_16),
            LimitKind::Maximum => (LOGICAL_MAX_8, LOGICAL_MAX_16),
        }
    }
}

/// An encoded Logical Minimum / Logical Maximum item (tag + payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitItem {
    bytes: [u8; 3],
    len: usize,
}

impl LimitItem {
    pub fn tag(&self) -> u8 {
        self.bytes[0]
    }

    /// Item bytes, tag first
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Encoded width in bytes (2 or 3)
    pub fn width(&self) -> usize {
        self.len
    }
}

/// Whether `value` fits a signed 8-bit payload
pub fn fits_in_8(value: i16) -> bool {
    i8::try_from(value).is_ok()
}

/// Encoded width of a limit item for `value`, without encoding it
pub fn limit_width(value: i16) -> usize {
    if fits_in_8(value) {
        2
    } else {
        3
    }
}

/// Encode one logical limit
pub fn encode_limit(value: i16, kind: LimitKind) -> LimitItem {
    let (tag_8, tag_16) = kind.tags();
    if fits_in_8(value) {
        LimitItem {
            bytes: [tag_8, value as u8, 0],
            len: 2,
        }
    } else {
        let [lo, hi] = value.to_le_bytes();
        LimitItem {
            bytes: [tag_16, lo, hi],
            len: 3,
        }
    }
}
