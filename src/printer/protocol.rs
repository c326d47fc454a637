//! ChiTu command encoding and response parsing.
//!
//! The firmware speaks a small G-code dialect over the serial link. Every
//! command is one line and produces exactly one response line:
//!
//! | Command | Meaning | Response |
//! |---------|---------|----------|
//! | `M4000` | print status | `ok B... D<cur>/<total>/<paused> ...` |
//! | `M4006` | selected file | `ok '<name>'` or `ok 'N0'` |
//! | `M4002` | firmware version | `ok <version>` |
//! | `M6030 '<name>'` | start printing a file | `ok ...` |
//! | `M25` / `M24` | pause / resume | `ok ...` |
//! | `M33 I5` | stop | `ok ...` |
//! | `M6040 I0` | reboot | `ok ...` |
//!
//! Parsers receive the response bytes exactly as they were read and hand
//! those same bytes back in [`PrinterError::UnexpectedPrinterResponse`] on
//! any mismatch, including a line that is not valid UTF-8.

use crate::error::PrinterError;

use super::status::{PrinterRawStatus, PrinterState};

/// Selected-file value meaning "nothing selected".
const NO_FILE_SELECTED: &str = "N0";

// =============================================================================
// Commands
// =============================================================================

/// A single request understood by the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    QueryStatus,
    QuerySelectedFile,
    QueryFirmwareVersion,
    StartPrint(String),
    Pause,
    Resume,
    Stop,
    Reboot,
}

impl Command {
    /// Encode as a protocol line, without the line terminator.
    ///
    /// Fails only for a start-print file name rejected by
    /// [`validate_filename`].
    pub fn encode(&self) -> Result<String, PrinterError> {
        let line = match self {
            Command::QueryStatus => "M4000".to_string(),
            Command::QuerySelectedFile => "M4006".to_string(),
            Command::QueryFirmwareVersion => "M4002".to_string(),
            Command::StartPrint(filename) => {
                validate_filename(filename)?;
                format!("M6030 '{}'", filename)
            }
            Command::Pause => "M25".to_string(),
            Command::Resume => "M24".to_string(),
            Command::Stop => "M33 I5".to_string(),
            Command::Reboot => "M6040 I0".to_string(),
        };
        Ok(line)
    }
}

/// Check that `filename` can be quoted into an `M6030` line.
///
/// The name is sent between single quotes on a single line, so it must be
/// non-empty and free of quotes and control characters.
pub fn validate_filename(filename: &str) -> Result<(), PrinterError> {
    let quotable = !filename.is_empty() && !filename.chars().any(|c| c == '\'' || c.is_control());

    if quotable {
        Ok(())
    } else {
        Err(PrinterError::InvalidFilename {
            filename: filename.to_string(),
        })
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Decode and strip the line terminator for parsing; the raw bytes are
/// kept for errors.
fn trim_line(raw: &[u8]) -> Result<&str, PrinterError> {
    std::str::from_utf8(raw)
        .map(|text| text.trim_end_matches(['\r', '\n']))
        .map_err(|_| PrinterError::unexpected(raw))
}

fn parse_counter(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Parse an `M4000` response.
///
/// The line must start with an `ok` token and contain exactly one
/// `D<current>/<total>/<paused>` token. Both counters must be plain decimal
/// digits and the pause flag must be `0` or `1`.
pub fn parse_status(raw: &[u8]) -> Result<PrinterRawStatus, PrinterError> {
    let unexpected = || PrinterError::unexpected(raw);

    let mut tokens = trim_line(raw)?.split_whitespace();
    if tokens.next() != Some("ok") {
        return Err(unexpected());
    }

    let mut progress_tokens = tokens.filter_map(|token| token.strip_prefix('D'));
    let progress = progress_tokens.next().ok_or_else(unexpected)?;
    if progress_tokens.next().is_some() {
        return Err(unexpected());
    }

    let fields: Vec<&str> = progress.split('/').collect();
    let [current, total, paused] = fields.as_slice() else {
        return Err(unexpected());
    };

    let current_byte = parse_counter(current).ok_or_else(unexpected)?;
    let total_bytes = parse_counter(total).ok_or_else(unexpected)?;
    let paused = match *paused {
        "0" => false,
        "1" => true,
        _ => return Err(unexpected()),
    };

    let state = if total_bytes == 0 {
        PrinterState::Idle
    } else if current_byte == 0 {
        PrinterState::StartingPrint
    } else if paused {
        PrinterState::Paused
    } else {
        PrinterState::Printing
    };

    Ok(PrinterRawStatus {
        state,
        current_byte,
        total_bytes,
    })
}

/// Parse an `M4006` response into the selected file name, if any.
pub fn parse_selected_file(raw: &[u8]) -> Result<Option<String>, PrinterError> {
    let name = trim_line(raw)?
        .strip_prefix("ok '")
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(|| PrinterError::unexpected(raw))?;

    if name == NO_FILE_SELECTED {
        Ok(None)
    } else {
        Ok(Some(name.to_string()))
    }
}

/// Parse an `M4002` response into the firmware version string.
pub fn parse_firmware_version(raw: &[u8]) -> Result<String, PrinterError> {
    trim_line(raw)?
        .strip_prefix("ok ")
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PrinterError::unexpected(raw))
}

/// Check a plain acknowledgement (`ok`, optionally followed by text).
pub fn parse_ack(raw: &[u8]) -> Result<(), PrinterError> {
    let line = trim_line(raw)?;
    let acknowledged = line
        .strip_prefix("ok")
        .map(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .unwrap_or(false);

    if acknowledged {
        Ok(())
    } else {
        Err(PrinterError::unexpected(raw))
    }
}
