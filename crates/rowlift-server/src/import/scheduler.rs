//! Continuation scheduler
//!
//! Computes the row range a continuation cycle receives. Two quota
//! baselines exist: a cycle that already ran under a negotiated range
//! forwards that range's width unchanged, while the first-ever continuation
//! sizes its chunk from the throughput observed in the current cycle (80%
//! of the rows scanned so far). Both branches are kept as-is; see
//! DESIGN.md.

use crate::sheet::RowRange;

/// Share of the observed scan count used to size the first continuation
/// chunk, in percent.
pub const FIRST_CONTINUATION_QUOTA_PERCENT: u32 = 80;

/// End row for the next continuation range.
///
/// `scanned_row` is the first row the continuation will process. The result
/// is clamped to `total_records + 1`, the file's last row; a non-positive
/// quota degenerates to a single-row range, never an empty or inverted one.
pub fn next_end_row(scanned_row: u32, current_range: Option<RowRange>, total_records: u32) -> u32 {
    let quota = match current_range {
        Some(range) => range.width(),
        None => scanned_row.saturating_sub(1) * FIRST_CONTINUATION_QUOTA_PERCENT / 100,
    };

    let next_end = scanned_row + quota;

    if total_records < next_end {
        total_records + 1
    } else {
        next_end
    }
}

/// Whether data rows remain in the file after scanning up to
/// `last_scanned_row`. The file's last row index is `total_records + 1`
/// (row 1 is the header).
pub fn rows_remain_after(last_scanned_row: u32, total_records: u32) -> bool {
    last_scanned_row < total_records + 1
}
