//! ChiTu slice-file decoder (`.ctb`, `.cbddlp`).
//!
//! # Key Concepts
//!
//! - **Header**: fixed 112-byte block at offset 0 with machine geometry,
//!   exposure settings, the layer count and offsets of everything else.
//!
//! - **Layer table**: one 36-byte record per layer locating that layer's
//!   encoded image. The cumulative end offsets form the layer boundary table
//!   used to turn printer byte telemetry into a layer index.
//!
//! - **Previews**: up to two run-length encoded RGB555 thumbnails.
//!
//! Decoding is a pure function of the input bytes, so callers may memoize it
//! by content or by (path, modification time).

mod document;
mod header;
mod layers;
mod preview;

pub use document::{decode, decode_preview, decode_preview_kind, SliceDocument};
pub use header::{CtbHeader, SliceFormat, CBDDLP_MAGIC, CTB_MAGIC, HEADER_SIZE};
pub use layers::{layer_byte_boundaries, parse_layer_table, LayerRecord, LAYER_RECORD_SIZE};
pub use preview::{decode_rle, read_preview, Bitmap, PreviewHeader, PreviewKind, PREVIEW_HEADER_SIZE};
