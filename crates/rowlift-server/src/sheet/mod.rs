//! Tabular file access
//!
//! Random-access row/column reading over xlsx and csv files, with an
//! optional row-range filter so continuation cycles only see their assigned
//! slice, plus the grid writer used for failure reports.
//!
//! Row and column indexes are 1-based, following spreadsheet convention
//! (`A1` is row 1, column 1). A row filter always admits row 1 so the header
//! row stays readable in filtered loads.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

mod csv_reader;
mod writer;
mod xlsx;

pub use csv_reader::CsvSheetReader;
pub use writer::ReportWriter;
pub use xlsx::XlsxSheetReader;

/// Errors raised while opening or reading tabular files
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inclusive row range assigned to one import cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of rows this range spans beyond its first row.
    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether a row is visible under this filter. Row 1 is always admitted
    /// so the header row can be read in filtered loads.
    pub fn admits(&self, row: u32) -> bool {
        row == 1 || (row >= self.start && row <= self.end)
    }
}

/// Random-access reader over one worksheet.
pub trait SheetReader: Send + Sync {
    /// Highest populated row, respecting the row filter.
    fn highest_row(&self) -> u32;

    /// Highest populated column (1-based index).
    fn highest_column(&self) -> u32;

    /// Cell value at (row, col); `Value::Null` for empty or filtered cells.
    fn cell_value(&self, row: u32, col: u32) -> Value;
}

/// Open a tabular file, choosing the reader from the file extension.
pub fn open(path: &Path, filter: Option<RowRange>) -> Result<Box<dyn SheetReader>, SheetError> {
    if !path.exists() {
        return Err(SheetError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" | "xls" => Ok(Box::new(XlsxSheetReader::open(path, filter)?)),
        "csv" => Ok(Box::new(CsvSheetReader::open(path, filter)?)),
        _ => Err(SheetError::UnsupportedFormat(ext)),
    }
}

/// Convert a column letter ("A", "AB") to a 1-based column index.
pub fn column_index_from_letter(letter: &str) -> Option<u32> {
    if letter.is_empty() {
        return None;
    }

    let mut index: u32 = 0;
    for c in letter.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        index = index.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(index)
}

/// Convert a 1-based column index to a column letter.
pub fn column_letter_from_index(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Highest spreadsheet date serial we accept (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

/// Convert a spreadsheet date serial (days since 1899-12-30, fractional
/// part = time of day) to a calendar date-time. Returns `None` for values
/// outside the representable range.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }

    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;

    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(chrono::Duration::days(days))?
        .checked_add_signed(chrono::Duration::seconds(secs))
}
