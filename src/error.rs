use std::time::Duration;

use thiserror::Error;

/// Errors raised while decoding a slice file.
///
/// Every variant is fatal to the decode call that produced it and to nothing
/// else: other files and printer sessions are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The buffer is shorter than the fixed-size header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Unknown magic number at offset 0
    #[error("Invalid magic number: 0x{0:08X}")]
    InvalidMagic(u32),

    /// Known magic, unsupported format version
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// The header declares no layers
    #[error("File declares no layers")]
    NoLayers,

    /// A structure referenced by the header runs past the end of the buffer
    #[error("Truncated {what}: need {requested} bytes at offset {offset}, file is {size} bytes")]
    Truncated {
        what: &'static str,
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Layer end offsets are not strictly increasing
    #[error("Layer {layer} ends at byte {end}, which does not follow the previous layer end {previous}")]
    NonMonotonicLayers { layer: usize, previous: u64, end: u64 },

    /// A layer ends beyond the end of the file
    #[error("Layer {layer} ends at byte {end}, past the end of the file ({size} bytes)")]
    LayerOutOfBounds { layer: usize, end: u64, size: u64 },

    /// The requested preview image is not present in the file
    #[error("File has no {0} preview")]
    MissingPreview(&'static str),

    /// A run-length encoded run spills over the end of its row
    #[error("Preview run of {run} pixels at ({x}, {y}) crosses the row boundary (width {width})")]
    RunCrossesRow { x: u32, y: u32, run: u32, width: u32 },

    /// The preview header declares dimensions beyond what any slicer writes
    #[error("Preview of {width}x{height} exceeds the {max}x{max} limit")]
    PreviewTooLarge { width: u32, height: u32, max: u32 },

    /// The run flag was set on the last word of the preview data
    #[error("Preview data ends in the middle of a run")]
    TruncatedRun,

    /// The expanded preview does not have exactly `width * height` pixels
    #[error("Preview decoded to {actual} pixels, expected {expected}")]
    PixelCountMismatch { expected: u64, actual: u64 },
}

/// Errors raised by the printer protocol driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrinterError {
    /// The device answered with a line that violates the protocol grammar.
    ///
    /// `raw_text` holds the response bytes exactly as received, invalid
    /// UTF-8, control characters and line terminator included.
    #[error(
        "The printer returned an unexpected response: '{}'",
        String::from_utf8_lossy(.raw_text)
    )]
    UnexpectedPrinterResponse { raw_text: Vec<u8> },

    /// A file name that cannot be quoted into a start-print command
    #[error("Invalid file name for the printer: {filename:?}")]
    InvalidFilename { filename: String },

    /// Opening, writing to or reading from the link failed
    #[error("Printer connection error: {0}")]
    Connection(String),

    /// No complete response line arrived within the read timeout
    #[error("Timed out after {timeout:?} waiting for a response to '{command}'")]
    Timeout { command: String, timeout: Duration },

    /// A previous command timed out; the session must be discarded
    #[error("Printer session is no longer usable after a timed-out command")]
    SessionPoisoned,
}

impl PrinterError {
    /// Build an `UnexpectedPrinterResponse` carrying the raw response bytes.
    pub fn unexpected(raw_text: impl Into<Vec<u8>>) -> Self {
        PrinterError::UnexpectedPrinterResponse {
            raw_text: raw_text.into(),
        }
    }

    /// Whether the session that produced this error can still be used.
    ///
    /// A protocol violation leaves the link framed on a line boundary, and
    /// a rejected file name never reaches the link at all.
    pub fn session_usable(&self) -> bool {
        matches!(
            self,
            PrinterError::UnexpectedPrinterResponse { .. } | PrinterError::InvalidFilename { .. }
        )
    }
}

/// Errors raised when encoding a decoded preview for display.
#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    /// The slice file itself could not be decoded
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The bitmap could not be encoded
    #[error("Failed to encode preview: {message}")]
    EncodeError { message: String },
}

/// Errors raised by the file browsing layer.
#[derive(Debug, Clone, Error)]
pub enum FileError {
    /// Path escapes the files directory or is otherwise malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Nothing exists at the path
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path exists but is not a regular file
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// The file name does not carry a supported slice-file extension
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// The slice file could not be decoded
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl FileError {
    /// Map a filesystem error for `path` into a `FileError`.
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(path.to_string()),
            _ => FileError::Io(format!("{}: {}", path, err)),
        }
    }
}
