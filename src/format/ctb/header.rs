//! CTB / CBDDLP file header parsing.
//!
//! # Header Structure (112 bytes, little-endian)
//!
//! ```text
//! 0x00  u32      magic (0x12FD0086 = CTB, 0x12FD0019 = CBDDLP)
//! 0x04  u32      version
//! 0x08  f32 x 3  bed size x, y, z (mm)
//! 0x14  u32 x 2  reserved
//! 0x1C  f32      total height (mm)
//! 0x20  f32      layer height (mm)
//! 0x24  f32      exposure (s)
//! 0x28  f32      bottom exposure (s)
//! 0x2C  f32      light-off delay (s)
//! 0x30  u32      bottom layer count
//! 0x34  u32 x 2  resolution x, y (px)
//! 0x3C  u32      large preview header offset (0 = absent)
//! 0x40  u32      layer table offset
//! 0x44  u32      layer count
//! 0x48  u32      small preview header offset (0 = absent)
//! 0x4C  u32      estimated print time (s)
//! 0x50  u32      projector type (1 = mirrored LCD)
//! 0x54  u32 x 2  print parameters offset, size
//! 0x5C  u32      anti-alias level
//! 0x60  u16 x 2  light PWM, bottom light PWM
//! 0x64  u32      encryption key
//! 0x68  u32 x 2  slicer info offset, size
//! ```

use crate::error::FormatError;
use crate::io::{read_f32_le, read_u16_le, read_u32_le};

// =============================================================================
// Constants
// =============================================================================

/// Magic number of `.ctb` files
pub const CTB_MAGIC: u32 = 0x12FD_0086;

/// Magic number of `.cbddlp` files (same layout as CTB)
pub const CBDDLP_MAGIC: u32 = 0x12FD_0019;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 0x70;

/// Oldest and newest header versions this parser understands.
const MIN_VERSION: u32 = 2;
const MAX_VERSION: u32 = 4;

// =============================================================================
// SliceFormat
// =============================================================================

/// Container flavour, identified by the magic number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SliceFormat {
    /// ChiTu `.ctb`
    #[default]
    Ctb,
    /// ChiTu `.cbddlp` / `.photon`
    Cbddlp,
}

impl SliceFormat {
    /// Identify the format from a magic number.
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            CTB_MAGIC => Some(SliceFormat::Ctb),
            CBDDLP_MAGIC => Some(SliceFormat::Cbddlp),
            _ => None,
        }
    }

    /// Magic number written at offset 0 for this format.
    pub const fn magic(&self) -> u32 {
        match self {
            SliceFormat::Ctb => CTB_MAGIC,
            SliceFormat::Cbddlp => CBDDLP_MAGIC,
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            SliceFormat::Ctb => "CTB",
            SliceFormat::Cbddlp => "CBDDLP",
        }
    }
}

// =============================================================================
// CtbHeader
// =============================================================================

/// Parsed fixed header.
///
/// Offsets are kept as raw `u32` file positions; the layer and preview
/// parsers validate them against the buffer they index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CtbHeader {
    pub format: SliceFormat,
    pub version: u32,
    pub bed_size_mm: (f32, f32, f32),
    pub height_mm: f32,
    pub layer_height_mm: f32,
    pub exposure_secs: f32,
    pub bottom_exposure_secs: f32,
    pub light_off_secs: f32,
    pub bottom_layer_count: u32,
    pub resolution: (u32, u32),
    pub large_preview_offset: u32,
    pub layer_table_offset: u32,
    pub layer_count: u32,
    pub small_preview_offset: u32,
    pub print_time_secs: u32,
    pub projector_type: u32,
    pub anti_alias_level: u32,
    pub light_pwm: u16,
    pub bottom_light_pwm: u16,
    pub encryption_key: u32,
}

impl CtbHeader {
    /// Parse the header from the start of a slice file.
    ///
    /// # Errors
    /// - `FileTooSmall` if fewer than [`HEADER_SIZE`] bytes are available
    /// - `InvalidMagic` if the magic is neither CTB nor CBDDLP
    /// - `UnsupportedVersion` if the version is outside 2..=4
    /// - `NoLayers` if the layer count is zero
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::FileTooSmall {
                required: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let magic = read_u32_le(&bytes[0x00..]);
        let format = SliceFormat::from_magic(magic).ok_or(FormatError::InvalidMagic(magic))?;

        let version = read_u32_le(&bytes[0x04..]);
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let layer_count = read_u32_le(&bytes[0x44..]);
        if layer_count == 0 {
            return Err(FormatError::NoLayers);
        }

        Ok(CtbHeader {
            format,
            version,
            bed_size_mm: (
                read_f32_le(&bytes[0x08..]),
                read_f32_le(&bytes[0x0C..]),
                read_f32_le(&bytes[0x10..]),
            ),
            height_mm: read_f32_le(&bytes[0x1C..]),
            layer_height_mm: read_f32_le(&bytes[0x20..]),
            exposure_secs: read_f32_le(&bytes[0x24..]),
            bottom_exposure_secs: read_f32_le(&bytes[0x28..]),
            light_off_secs: read_f32_le(&bytes[0x2C..]),
            bottom_layer_count: read_u32_le(&bytes[0x30..]),
            resolution: (read_u32_le(&bytes[0x34..]), read_u32_le(&bytes[0x38..])),
            large_preview_offset: read_u32_le(&bytes[0x3C..]),
            layer_table_offset: read_u32_le(&bytes[0x40..]),
            layer_count,
            small_preview_offset: read_u32_le(&bytes[0x48..]),
            print_time_secs: read_u32_le(&bytes[0x4C..]),
            projector_type: read_u32_le(&bytes[0x50..]),
            anti_alias_level: read_u32_le(&bytes[0x5C..]),
            light_pwm: read_u16_le(&bytes[0x60..]),
            bottom_light_pwm: read_u16_le(&bytes[0x62..]),
            encryption_key: read_u32_le(&bytes[0x64..]),
        })
    }

    /// Whether the image is projected through a mirrored LCD.
    #[inline]
    pub const fn is_mirrored(&self) -> bool {
        self.projector_type != 0
    }
}

// =============================================================================
// Tests
// =============================================================================
