//! Bounds-checked descriptor builder
//!
//! Every operation takes the buffer and the current [`Cursor`] and returns
//! the next cursor. A failed cursor short-circuits: the operation returns it
//! unchanged and leaves the buffer untouched, so a whole chain can be written
//! without checking each step and inspected once at the end.

use std::fmt::Write as _;

use thiserror::Error;

use super::encoder::{encode_limit, limit_width, LimitKind};
use super::items::{Axis, AxisSpec, ControlProfile, AXIS_FOOTER, AXIS_HEADER, AXIS_USAGE_OFFSET};

/// Descriptor build errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Descriptor capacity exceeded: {needed} bytes at offset {offset}, capacity {capacity}")]
    CapacityExceeded {
        offset: usize,
        needed: usize,
        capacity: usize,
    },

    #[error("Unrecognized usage page 0x{0:02x} in descriptor preamble")]
    UnrecognizedProfile(u8),

    #[error("Descriptor has no preamble to close")]
    MissingPreamble,

    #[error("Descriptor preamble already written for {0:?}")]
    AlreadyBegun(ControlProfile),
}

/// Write position in a descriptor buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Next byte goes to `offset`; `profile` is set once a preamble is written
    At {
        offset: usize,
        profile: Option<ControlProfile>,
    },
    /// The chain failed, carrying the first error
    Failed(DescriptorError),
}

impl Cursor {
    /// Cursor at the start of an empty buffer
    pub fn start() -> Self {
        Cursor::At {
            offset: 0,
            profile: None,
        }
    }

    /// Resume a chain over bytes already present in the buffer
    pub fn at(offset: usize) -> Self {
        Cursor::At {
            offset,
            profile: None,
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            Cursor::At { offset, .. } => Some(*offset),
            Cursor::Failed(_) => None,
        }
    }

    pub fn profile(&self) -> Option<ControlProfile> {
        match self {
            Cursor::At { profile, .. } => *profile,
            Cursor::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Cursor::Failed(_))
    }

    /// Run `f` on a valid cursor, pass a failed one through untouched
    pub fn and_then<F>(self, f: F) -> Cursor
    where
        F: FnOnce(usize, Option<ControlProfile>) -> Cursor,
    {
        match self {
            Cursor::At { offset, profile } => f(offset, profile),
            failed => failed,
        }
    }

    /// Final offset, or the error that stopped the chain
    pub fn into_result(self) -> Result<usize, DescriptorError> {
        match self {
            Cursor::At { offset, .. } => Ok(offset),
            Cursor::Failed(e) => Err(e),
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

impl From<Result<Cursor, DescriptorError>> for Cursor {
    fn from(result: Result<Cursor, DescriptorError>) -> Self {
        result.unwrap_or_else(Cursor::Failed)
    }
}

/// End offset of a `needed`-byte run at `offset`, if it fits
fn reserve(capacity: usize, offset: usize, needed: usize) -> Result<usize, DescriptorError> {
    match offset.checked_add(needed) {
        Some(end) if end <= capacity => Ok(end),
        _ => Err(DescriptorError::CapacityExceeded {
            offset,
            needed,
            capacity,
        }),
    }
}

/// Write the profile preamble
///
/// A descriptor holds one top-level collection, so a cursor that already
/// carries a profile fails with [`DescriptorError::AlreadyBegun`].
pub fn begin(profile: ControlProfile, buf: &mut [u8], cursor: Cursor) -> Cursor {
    cursor.and_then(|offset, opened| {
        if let Some(opened) = opened {
            return Cursor::Failed(DescriptorError::AlreadyBegun(opened));
        }
        let preamble = profile.preamble();
        reserve(buf.len(), offset, preamble.len())
            .map(|end| {
                buf[offset..end].copy_from_slice(preamble);
                Cursor::At {
                    offset: end,
                    profile: Some(profile),
                }
            })
            .into()
    })
}

/// Encoded length of one axis declaration
pub fn axis_len(minimum: i16, maximum: i16) -> usize {
    AXIS_HEADER.len() + AXIS_FOOTER.len() + limit_width(minimum) + limit_width(maximum)
}

/// Append one linear axis declaration
///
/// Writes nothing when the whole item does not fit.
pub fn add_axis(axis: Axis, minimum: i16, maximum: i16, buf: &mut [u8], cursor: Cursor) -> Cursor {
    cursor.and_then(|offset, profile| {
        let total = axis_len(minimum, maximum);
        let end = match reserve(buf.len(), offset, total) {
            Ok(end) => end,
            Err(e) => return Cursor::Failed(e),
        };

        let min = encode_limit(minimum, LimitKind::Minimum);
        let max = encode_limit(maximum, LimitKind::Maximum);
        let mut pos = offset;
        for bytes in [AXIS_HEADER, min.as_bytes(), max.as_bytes(), AXIS_FOOTER] {
            buf[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        }
        buf[offset + AXIS_USAGE_OFFSET] = axis.usage();
        debug_assert_eq!(pos, end);

        Cursor::At {
            offset: end,
            profile,
        }
    })
}

/// Append the closure matching the opened collections
///
/// Uses the profile carried by the cursor. A resumed cursor without one
/// falls back to the usage page byte written at position 1.
pub fn close(buf: &mut [u8], cursor: Cursor) -> Cursor {
    cursor.and_then(|offset, profile| {
        let profile = match profile {
            Some(profile) => profile,
            None => match written_profile(buf, offset) {
                Ok(profile) => profile,
                Err(e) => return Cursor::Failed(e),
            },
        };
        let closure = profile.closure();
        reserve(buf.len(), offset, closure.len())
            .map(|end| {
                buf[offset..end].copy_from_slice(closure);
                Cursor::At {
                    offset: end,
                    profile: Some(profile),
                }
            })
            .into()
    })
}

fn written_profile(buf: &[u8], offset: usize) -> Result<ControlProfile, DescriptorError> {
    let page = match buf.get(1) {
        Some(page) if offset >= 2 => *page,
        _ => return Err(DescriptorError::MissingPreamble),
    };
    ControlProfile::from_usage_page(page).ok_or(DescriptorError::UnrecognizedProfile(page))
}

/// Chaining front-end over a borrowed buffer
pub struct DescriptorWriter<'a> {
    buf: &'a mut [u8],
    cursor: Cursor,
}

impl<'a> DescriptorWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            cursor: Cursor::start(),
        }
    }

    pub fn begin(&mut self, profile: ControlProfile) -> &mut Self {
        let cursor = std::mem::take(&mut self.cursor);
        self.cursor = begin(profile, self.buf, cursor);
        self
    }

    pub fn axis(&mut self, spec: &AxisSpec) -> &mut Self {
        let cursor = std::mem::take(&mut self.cursor);
        self.cursor = add_axis(spec.axis, spec.minimum, spec.maximum, self.buf, cursor);
        self
    }

    pub fn close(&mut self) -> &mut Self {
        let cursor = std::mem::take(&mut self.cursor);
        self.cursor = close(self.buf, cursor);
        self
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Written bytes, or the error that stopped the chain
    pub fn finish(&self) -> Result<&[u8], DescriptorError> {
        let len = self.cursor.clone().into_result()?;
        Ok(&self.buf[..len])
    }
}

/// A complete report descriptor ready to hand to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDescriptor {
    profile: ControlProfile,
    bytes: Vec<u8>,
}

impl ReportDescriptor {
    /// Build a descriptor declaring `axes` in order, within `capacity` bytes
    ///
    /// Allocates no more than the encoded descriptor needs.
    pub fn build(
        profile: ControlProfile,
        axes: &[AxisSpec],
        capacity: usize,
    ) -> Result<Self, DescriptorError> {
        let needed = axes
            .iter()
            .map(|spec| axis_len(spec.minimum, spec.maximum))
            .fold(profile.preamble().len() + profile.closure().len(), usize::saturating_add);
        let mut buf = vec![0u8; capacity.min(needed)];
        let mut writer = DescriptorWriter::new(&mut buf);
        writer.begin(profile);
        for spec in axes {
            writer.axis(spec);
        }
        writer.close();
        let len = writer.finish()?.len();
        buf.truncate(len);

        Ok(Self {
            profile,
            bytes: buf,
        })
    }

    pub fn profile(&self) -> ControlProfile {
        self.profile
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex dump, 16 bytes per line
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 3);
        for line in self.bytes.chunks(16) {
            for (i, b) in line.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{:02x}", b);
            }
            out.push('\n');
        }
        out
    }
}
