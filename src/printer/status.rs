//! Printer status value types.

use serde::Serialize;

/// Coarse lifecycle state of the printer.
///
/// This is a closed set: a status line that does not map onto one of these
/// variants is a protocol error, never a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrinterState {
    Idle,
    StartingPrint,
    Printing,
    Paused,
}

impl PrinterState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PrinterState::Idle => "IDLE",
            PrinterState::StartingPrint => "STARTING_PRINT",
            PrinterState::Printing => "PRINTING",
            PrinterState::Paused => "PAUSED",
        }
    }

    /// Whether a print job is associated with this state.
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, PrinterState::Idle)
    }
}

impl std::fmt::Display for PrinterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the device's print-job telemetry.
///
/// The byte counters are reported by the firmware as-is and are not checked
/// against any slice file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterRawStatus {
    pub state: PrinterState,
    /// Bytes of the slice file consumed so far
    pub current_byte: u64,
    /// Size of the slice file being printed
    pub total_bytes: u64,
}

impl PrinterRawStatus {
    /// Status of a printer with no job.
    pub const fn idle() -> Self {
        PrinterRawStatus {
            state: PrinterState::Idle,
            current_byte: 0,
            total_bytes: 0,
        }
    }
}
