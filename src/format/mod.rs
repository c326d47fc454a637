//! Slice-file format support.
//!
//! The printer consumes ChiTu slice files: a fixed binary header, a table of
//! per-layer records and up to two run-length encoded preview thumbnails.
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to identify the container flavour of a file.
//! Currently supported formats:
//!
//! - **CTB**: magic `0x12FD0086`
//! - **CBDDLP**: magic `0x12FD0019`, same layout as CTB

pub mod ctb;
pub mod detect;

pub use ctb::{decode, decode_preview, decode_preview_kind, Bitmap, PreviewKind, SliceDocument};
pub use detect::{detect_format, is_slice_file_name, SliceFormat};
