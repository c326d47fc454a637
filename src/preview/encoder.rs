//! PNG preview encoder.
//!
//! Decoded previews are raw RGB8 bitmaps. Browsers need a compressed image,
//! so previews are encoded to PNG on demand when the preview endpoint is hit.
//! Metadata queries never pay for this.
//!
//! The output is a valid PNG of the same dimensions and pixels, but the exact
//! bytes depend on the encoder's compression choices and are not stable
//! across implementations. Use [`preview_etag`] for cache validation, not for
//! comparing against externally produced files.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use sha2::{Digest, Sha256};

use crate::error::PreviewError;
use crate::format::Bitmap;

/// PNG encoder for decoded slice-file previews.
#[derive(Debug, Clone, Default)]
pub struct PngPreviewEncoder {}

impl PngPreviewEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode a bitmap as PNG.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if the bitmap is empty, its buffer does not
    /// match its dimensions, or the PNG encoder fails.
    pub fn encode(&self, bitmap: &Bitmap) -> Result<Bytes, PreviewError> {
        if bitmap.width == 0 || bitmap.height == 0 {
            return Err(PreviewError::EncodeError {
                message: "preview has no pixels".to_string(),
            });
        }

        let expected_len = bitmap.pixel_count() * 3;
        if bitmap.pixels.len() as u64 != expected_len {
            return Err(PreviewError::EncodeError {
                message: format!(
                    "pixel buffer is {} bytes, expected {}",
                    bitmap.pixels.len(),
                    expected_len
                ),
            });
        }

        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(
                &bitmap.pixels,
                bitmap.width,
                bitmap.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| PreviewError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

/// Strong entity tag for encoded preview bytes (quoted SHA-256 hex).
pub fn preview_etag(encoded: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(encoded)))
}
