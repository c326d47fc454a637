//! On-demand preview encoding.
//!
//! Turns decoded [`Bitmap`](crate::format::Bitmap) previews into PNG bytes
//! suitable for serving over HTTP.

mod encoder;

pub use encoder::{preview_etag, PngPreviewEncoder};
