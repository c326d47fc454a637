//! Layer table parsing.
//!
//! The header points at a table of `layer_count` fixed-size records. Each
//! record locates one layer image inside the file; the end of that image
//! (`data_offset + data_length`) is the number of bytes the printer has
//! streamed once the layer is complete, which is what lets byte-position
//! telemetry be mapped back onto a layer index.
//!
//! ```text
//! 0x00  f32      z position (mm)
//! 0x04  f32      exposure (s)
//! 0x08  f32      light-off delay (s)
//! 0x0C  u32      data offset
//! 0x10  u32      data length
//! 0x14  u32 x 4  reserved
//! ```

use crate::error::FormatError;
use crate::io::{read_f32_le, read_u32_le, slice_at};

/// Size of one layer record in bytes (the table stride).
pub const LAYER_RECORD_SIZE: usize = 36;

/// One entry of the layer table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerRecord {
    /// Height of the layer above the build plate.
    pub z_mm: f32,
    pub exposure_secs: f32,
    pub light_off_secs: f32,
    /// File offset of the encoded layer image.
    pub data_offset: u32,
    /// Encoded size of the layer image.
    pub data_length: u32,
}

impl LayerRecord {
    /// Parse a record from exactly [`LAYER_RECORD_SIZE`] bytes.
    fn parse(bytes: &[u8]) -> Self {
        LayerRecord {
            z_mm: read_f32_le(&bytes[0x00..]),
            exposure_secs: read_f32_le(&bytes[0x04..]),
            light_off_secs: read_f32_le(&bytes[0x08..]),
            data_offset: read_u32_le(&bytes[0x0C..]),
            data_length: read_u32_le(&bytes[0x10..]),
        }
    }

    /// Byte position at which this layer's data ends.
    #[inline]
    pub fn end_offset(&self) -> u64 {
        u64::from(self.data_offset) + u64::from(self.data_length)
    }
}

/// Read `count` layer records starting at `table_offset`.
///
/// # Errors
/// `Truncated` if the table does not fit in `bytes`.
pub fn parse_layer_table(
    bytes: &[u8],
    table_offset: u32,
    count: u32,
) -> Result<Vec<LayerRecord>, FormatError> {
    let count = count as usize;
    let table_len = count
        .checked_mul(LAYER_RECORD_SIZE)
        .ok_or(FormatError::Truncated {
            what: "layer table",
            offset: u64::from(table_offset),
            requested: u64::MAX,
            size: bytes.len() as u64,
        })?;
    let table = slice_at(bytes, u64::from(table_offset), table_len, "layer table")?;

    Ok(table
        .chunks_exact(LAYER_RECORD_SIZE)
        .map(LayerRecord::parse)
        .collect())
}

/// Compute the cumulative byte boundary of every layer.
///
/// # Errors
/// - `NonMonotonicLayers` if a boundary does not strictly exceed the previous one
/// - `LayerOutOfBounds` if a boundary lies beyond `file_size`
pub fn layer_byte_boundaries(
    layers: &[LayerRecord],
    file_size: u64,
) -> Result<Vec<u64>, FormatError> {
    let mut boundaries = Vec::with_capacity(layers.len());

    for (index, layer) in layers.iter().enumerate() {
        let end = layer.end_offset();

        if let Some(&previous) = boundaries.last() {
            if end <= previous {
                return Err(FormatError::NonMonotonicLayers {
                    layer: index,
                    previous,
                    end,
                });
            }
        }

        if end > file_size {
            return Err(FormatError::LayerOutOfBounds {
                layer: index,
                end,
                size: file_size,
            });
        }

        boundaries.push(end);
    }

    Ok(boundaries)
}
