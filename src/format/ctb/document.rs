//! Whole-file decoding into a [`SliceDocument`].

use crate::error::FormatError;

use super::header::{CtbHeader, SliceFormat};
use super::layers::{layer_byte_boundaries, parse_layer_table, LayerRecord};
use super::preview::{read_preview, Bitmap, PreviewKind};

/// Decoded, immutable view of one slice file.
///
/// Produced by [`decode`]; two decodes of the same bytes compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceDocument {
    pub format: SliceFormat,
    pub version: u32,

    /// Projector resolution in pixels (x, y)
    pub resolution: (u32, u32),

    /// Physical build volume in millimetres (x, y, z)
    pub bed_size_mm: (f32, f32, f32),

    /// Height of the sliced model
    pub height_mm: f32,
    pub layer_height_mm: f32,

    /// Always at least 1 for decoded files
    pub layer_count: u32,

    /// Print time estimated by the slicer
    pub print_time_secs: u32,

    pub exposure_secs: f32,
    pub bottom_exposure_secs: f32,
    pub light_off_secs: f32,
    pub bottom_layer_count: u32,
    pub anti_alias_level: u32,
    pub mirrored: bool,

    /// One record per layer, in print order
    pub layers: Vec<LayerRecord>,

    /// Byte position at which each layer's data ends; strictly increasing,
    /// `layer_count` entries
    pub layer_byte_boundaries: Vec<u64>,

    pub large_preview: Option<Bitmap>,
    pub small_preview: Option<Bitmap>,
}

impl SliceDocument {
    /// Embedded previews, large first.
    pub fn preview_images(&self) -> impl Iterator<Item = &Bitmap> {
        self.large_preview.iter().chain(self.small_preview.iter())
    }

    /// Byte position at which the last layer ends.
    pub fn payload_end(&self) -> u64 {
        self.layer_byte_boundaries.last().copied().unwrap_or(0)
    }
}

/// Decode a complete slice file.
///
/// Parses the header, walks the layer table and expands both embedded
/// previews. Does not re-encode anything.
///
/// # Errors
/// Any [`FormatError`]: short or unrecognised header, truncated layer table,
/// non-increasing or out-of-range layer boundaries, malformed preview.
pub fn decode(bytes: &[u8]) -> Result<SliceDocument, FormatError> {
    let header = CtbHeader::parse(bytes)?;

    let layers = parse_layer_table(bytes, header.layer_table_offset, header.layer_count)?;
    let layer_byte_boundaries = layer_byte_boundaries(&layers, bytes.len() as u64)?;

    let large_preview = optional_preview(bytes, header.large_preview_offset)?;
    let small_preview = optional_preview(bytes, header.small_preview_offset)?;

    Ok(SliceDocument {
        format: header.format,
        version: header.version,
        resolution: header.resolution,
        bed_size_mm: header.bed_size_mm,
        height_mm: header.height_mm,
        layer_height_mm: header.layer_height_mm,
        layer_count: header.layer_count,
        print_time_secs: header.print_time_secs,
        exposure_secs: header.exposure_secs,
        bottom_exposure_secs: header.bottom_exposure_secs,
        light_off_secs: header.light_off_secs,
        bottom_layer_count: header.bottom_layer_count,
        anti_alias_level: header.anti_alias_level,
        mirrored: header.is_mirrored(),
        layers,
        layer_byte_boundaries,
        large_preview,
        small_preview,
    })
}

/// Decode the large preview of a slice file without touching the layer table.
pub fn decode_preview(bytes: &[u8]) -> Result<Bitmap, FormatError> {
    decode_preview_kind(bytes, PreviewKind::Large)
}

/// Decode one specific preview of a slice file.
///
/// # Errors
/// `MissingPreview` if the header has no offset for the requested preview.
pub fn decode_preview_kind(bytes: &[u8], kind: PreviewKind) -> Result<Bitmap, FormatError> {
    let header = CtbHeader::parse(bytes)?;
    let offset = match kind {
        PreviewKind::Large => header.large_preview_offset,
        PreviewKind::Small => header.small_preview_offset,
    };

    if offset == 0 {
        return Err(FormatError::MissingPreview(kind.name()));
    }
    read_preview(bytes, offset)
}

fn optional_preview(bytes: &[u8], offset: u32) -> Result<Option<Bitmap>, FormatError> {
    if offset == 0 {
        return Ok(None);
    }
    read_preview(bytes, offset).map(Some)
}
