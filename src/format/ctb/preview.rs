//! Embedded preview thumbnails.
//!
//! A slice file carries up to two previews (large and small). Each preview
//! starts with a 32-byte header:
//!
//! ```text
//! 0x00  u32      width (px)
//! 0x04  u32      height (px)
//! 0x08  u32      data offset
//! 0x0C  u32      data length
//! 0x10  u32 x 4  reserved
//! ```
//!
//! The pixel data is a sequence of little-endian 16-bit words, each packing a
//! 15-bit colour and a run flag:
//!
//! ```text
//! bit  15..11  10..6  5     4..0
//!      red     green  run   blue
//! ```
//!
//! When the run flag is set, the next word holds the extra repeat count in
//! its low 12 bits, so a run covers `1 + (next & 0x0FFF)` pixels. The value
//! `0x0FFF` is reserved as the row-end sentinel: the colour fills the rest of
//! the current row. Runs never continue from one row into the next.

use crate::error::FormatError;
use crate::io::{read_u16_le, read_u32_le, slice_at};

/// Size of a preview header in bytes
pub const PREVIEW_HEADER_SIZE: usize = 32;

const RUN_FLAG: u16 = 0x0020;
const RUN_COUNT_MASK: u16 = 0x0FFF;
const ROW_END_SENTINEL: u16 = 0x0FFF;

/// Largest accepted preview width or height in pixels.
///
/// Also bounds the row-end sentinel, so no single run expands to more than
/// this many pixels.
pub const MAX_PREVIEW_DIMENSION: u32 = 4096;

// =============================================================================
// Bitmap
// =============================================================================

/// A decoded RGB8 image, stored row-major without padding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Number of pixels in the image.
    #[inline]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Iterate over pixel rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // `max(1)` keeps chunks() valid for zero-width images, which have no pixels anyway
        self.pixels.chunks((self.width as usize * 3).max(1))
    }

    /// RGB value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }
}

// =============================================================================
// Preview header
// =============================================================================

/// Which of the two embedded previews to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Large,
    Small,
}

impl PreviewKind {
    pub const fn name(&self) -> &'static str {
        match self {
            PreviewKind::Large => "large",
            PreviewKind::Small => "small",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewHeader {
    pub width: u32,
    pub height: u32,
    pub data_offset: u32,
    pub data_length: u32,
}

impl PreviewHeader {
    /// Parse the preview header located at `offset`.
    pub fn parse(bytes: &[u8], offset: u32) -> Result<Self, FormatError> {
        let header = slice_at(bytes, u64::from(offset), PREVIEW_HEADER_SIZE, "preview header")?;
        Ok(PreviewHeader {
            width: read_u32_le(&header[0x00..]),
            height: read_u32_le(&header[0x04..]),
            data_offset: read_u32_le(&header[0x08..]),
            data_length: read_u32_le(&header[0x0C..]),
        })
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the preview whose header is at `header_offset`.
pub fn read_preview(bytes: &[u8], header_offset: u32) -> Result<Bitmap, FormatError> {
    let header = PreviewHeader::parse(bytes, header_offset)?;
    let data = slice_at(
        bytes,
        u64::from(header.data_offset),
        header.data_length as usize,
        "preview data",
    )?;
    decode_rle(data, header.width, header.height)
}

/// Expand run-length encoded preview data into a `width x height` bitmap.
///
/// # Errors
/// - `PreviewTooLarge` if either dimension exceeds [`MAX_PREVIEW_DIMENSION`]
/// - `TruncatedRun` if a run flag is set on the final word
/// - `RunCrossesRow` if a run is longer than what is left of its row
/// - `PixelCountMismatch` if the runs do not add up to `width * height`
pub fn decode_rle(data: &[u8], width: u32, height: u32) -> Result<Bitmap, FormatError> {
    if width > MAX_PREVIEW_DIMENSION || height > MAX_PREVIEW_DIMENSION {
        return Err(FormatError::PreviewTooLarge {
            width,
            height,
            max: MAX_PREVIEW_DIMENSION,
        });
    }

    let expected = u64::from(width) * u64::from(height);
    // A word pair expands to at most MAX_PREVIEW_DIMENSION pixels
    let max_producible = (data.len() as u64 / 4).saturating_mul(u64::from(MAX_PREVIEW_DIMENSION))
        + data.len() as u64 / 2;
    let mut pixels = Vec::with_capacity((expected.min(max_producible) * 3) as usize);

    let mut words = data.chunks_exact(2).map(read_u16_le);
    let mut x: u32 = 0;
    let mut y: u32 = 0;
    let mut total: u64 = 0;

    while let Some(word) = words.next() {
        let color = expand_color(word);
        let remaining = width - x;

        let run = if word & RUN_FLAG != 0 {
            let count = words.next().ok_or(FormatError::TruncatedRun)? & RUN_COUNT_MASK;
            if count == ROW_END_SENTINEL {
                remaining
            } else {
                1 + u32::from(count)
            }
        } else {
            1
        };

        if run == 0 || run > remaining {
            return Err(FormatError::RunCrossesRow { x, y, run, width });
        }

        // Keep counting past the end of the image so the error reports the real total
        if y < height {
            for _ in 0..run {
                pixels.extend_from_slice(&color);
            }
        }

        total += u64::from(run);
        x += run;
        if x == width {
            x = 0;
            y += 1;
        }
    }

    if total != expected {
        return Err(FormatError::PixelCountMismatch {
            expected,
            actual: total,
        });
    }

    Ok(Bitmap {
        width,
        height,
        pixels,
    })
}

/// Expand a packed 5-5-5 colour word to 8-bit RGB.
#[inline]
fn expand_color(word: u16) -> [u8; 3] {
    let expand = |c: u16| -> u8 {
        let c = (c & 0x1F) as u8;
        (c << 3) | (c >> 2)
    };
    [expand(word >> 11), expand(word >> 6), expand(word)]
}
