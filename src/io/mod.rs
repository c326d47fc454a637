//! Byte-level helpers shared by the format parsers.

mod bytes;

pub use bytes::{read_f32_le, read_u16_le, read_u32_le, slice_at};
