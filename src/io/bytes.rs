//! Little-endian field access over an in-memory slice file.
//!
//! Slice files are small enough to be read whole, so every structure is
//! addressed as an `(offset, len)` window into one buffer. Windows are
//! bounds-checked once with [`slice_at`]; the fixed-width readers below then
//! assume their input is long enough.

use crate::error::FormatError;

/// Borrow `len` bytes at `offset`, naming `what` in the error if the window
/// runs past the end of `bytes`.
pub fn slice_at<'a>(
    bytes: &'a [u8],
    offset: u64,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], FormatError> {
    let truncated = || FormatError::Truncated {
        what,
        offset,
        requested: len as u64,
        size: bytes.len() as u64,
    };

    let start = usize::try_from(offset).map_err(|_| truncated())?;
    let end = start.checked_add(len).ok_or_else(truncated)?;
    bytes.get(start..end).ok_or_else(truncated)
}

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian IEEE-754 single from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_bits(read_u32_le(bytes))
}
