//! # Mariner
//!
//! A print server for ChiTu-based masked-SLA resin printers such as the
//! Elegoo Mars.
//!
//! The printer mainboard reads slice files from a USB drive and accepts
//! commands over a serial line. Mariner sits between the two: it shares the
//! files directory with the printer, decodes the CTB slice files it finds
//! there, and drives the printer over serial so a browser can start, pause
//! and monitor prints.
//!
//! ## Architecture
//!
//! - [`mod@format`] - CTB/CBDDLP slice-file decoding (header, layer table, previews)
//! - [`progress`] - Maps the printer's byte offset to layer, percentage and time left
//! - [`printer`] - Serial protocol driver and printer sessions
//! - [`files`] - Files directory browsing, uploads and decoded-file caching
//! - [`preview`] - PNG encoding of embedded previews
//! - [`server`] - Axum-based HTTP API
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mariner::printer::{SerialConfig, SerialConnector};
//! use mariner::server::{create_router, AppState, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let connector = SerialConnector::new(SerialConfig::default());
//!     let state = AppState::new("/mnt/usb_share", connector);
//!     let router = create_router(state, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod format;
pub mod io;
pub mod preview;
pub mod printer;
pub mod progress;
pub mod server;

// Re-export commonly used types
pub use config::{Cli, Command, InspectConfig, PrinterArgs, ServeConfig, StatusConfig};
pub use error::{FileError, FormatError, PreviewError, PrinterError};
pub use files::{DirectoryListing, SliceCache};
pub use format::{
    decode, decode_preview, decode_preview_kind, detect_format, Bitmap, PreviewKind,
    SliceDocument, SliceFormat,
};
pub use preview::{preview_etag, PngPreviewEncoder};
pub use printer::{
    with_printer, PrinterConnector, PrinterControl, PrinterRawStatus, PrinterSession,
    PrinterState, SerialConfig, SerialConnector,
};
pub use progress::{compute, ProgressReport};
pub use server::{create_router, AppState, RouterConfig};
