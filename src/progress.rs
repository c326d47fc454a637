//! Print progress derived from printer byte telemetry.
//!
//! The firmware only reports how many bytes of the slice file it has
//! consumed. Layer payload sizes vary with geometry, so that byte count is a
//! poor progress signal on its own. Instead the byte position is located in
//! the document's layer boundary table and progress is reported as the
//! fraction of layers completed.

use serde::Serialize;

use crate::format::SliceDocument;
use crate::printer::{PrinterRawStatus, PrinterState};

/// Derived view of an active print. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressReport {
    /// 1-based index of the layer being printed, in `[1, layer_count]`
    pub current_layer: u32,
    /// Layers completed as a percentage, in `[0, 100)`
    pub progress_pct: f64,
    pub time_left_secs: u64,
}

/// Map a byte position onto a 1-based layer index.
///
/// Counts the boundaries strictly below `current_byte` (a leftmost
/// insertion-point search) and clamps the result to `[1, boundaries.len()]`.
pub fn current_layer_for_byte(boundaries: &[u64], current_byte: u64) -> u32 {
    let completed = boundaries.partition_point(|&end| end < current_byte);
    let layer = (completed + 1).min(boundaries.len()).max(1);
    u32::try_from(layer).unwrap_or(u32::MAX)
}

/// Compute the progress of the print described by `status`.
///
/// Returns `None` when the printer is idle, or when the document has no
/// layers to measure against.
pub fn compute(doc: &SliceDocument, status: &PrinterRawStatus) -> Option<ProgressReport> {
    if status.state == PrinterState::Idle || doc.layer_count == 0 {
        return None;
    }

    let current_layer =
        current_layer_for_byte(&doc.layer_byte_boundaries, status.current_byte)
            .min(doc.layer_count);

    let progress_pct = f64::from(current_layer - 1) / f64::from(doc.layer_count) * 100.0;
    let time_left = (f64::from(doc.print_time_secs) * (1.0 - progress_pct / 100.0)).round();

    Some(ProgressReport {
        current_layer,
        progress_pct,
        time_left_secs: time_left.max(0.0) as u64,
    })
}
