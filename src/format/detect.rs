//! Format detection for slice files.
//!
//! Files are classified by the magic number at offset 0; file names by their
//! extension. Anything else is rejected so that uploads and listings only
//! ever offer files the printer can actually run.

use crate::error::FormatError;
use crate::io::read_u32_le;

pub use super::ctb::SliceFormat;

/// Extensions the printer firmware accepts, lowercase.
pub const SLICE_FILE_EXTENSIONS: &[&str] = &["ctb", "cbddlp"];

/// Detect the format of a slice file from its leading bytes.
///
/// Only the magic number is examined; use [`super::decode`] to validate the
/// rest of the file.
pub fn detect_format(bytes: &[u8]) -> Result<SliceFormat, FormatError> {
    if bytes.len() < 4 {
        return Err(FormatError::FileTooSmall {
            required: 4,
            actual: bytes.len() as u64,
        });
    }

    let magic = read_u32_le(bytes);
    SliceFormat::from_magic(magic).ok_or(FormatError::InvalidMagic(magic))
}

/// Check whether a file name carries a slice-file extension (case-insensitive).
pub fn is_slice_file_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SLICE_FILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
