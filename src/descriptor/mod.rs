//! HID report descriptor construction
//!
//! Descriptors are assembled into a caller-owned buffer:
//! ```text
//! <profile preamble>
//!   <axis item>*      (usage page, usage, logical min/max, 16-bit input)
//! <profile closure>
//! ```
//!
//! The free functions in [`builder`] mirror the item grammar one call per
//! fragment; [`DescriptorWriter`] and [`ReportDescriptor`] wrap them for the
//! common case of building a whole descriptor at once.

pub mod builder;
pub mod encoder;
pub mod items;

pub use builder::{
    add_axis, axis_len, begin, close, Cursor, DescriptorError, DescriptorWriter, ReportDescriptor,
};
pub use encoder::{encode_limit, limit_width, LimitItem, LimitKind};
pub use items::{Axis, AxisSpec, ControlProfile};
