//! Csv reader with spreadsheet-style row/column access

use csv::ReaderBuilder;
use serde_json::Value;
use std::path::Path;

use super::{RowRange, SheetError, SheetReader};

/// Random-access reader over a csv file.
///
/// Rows are loaded up front so the import loop gets the same random-access
/// contract as the xlsx reader. The header row is NOT interpreted here; the
/// pipeline derives header columns from row 1 itself.
pub struct CsvSheetReader {
    rows: Vec<Vec<String>>,
    width: u32,
    filter: Option<RowRange>,
}

impl CsvSheetReader {
    pub fn open(path: &Path, filter: Option<RowRange>) -> Result<Self, SheetError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|field| field.trim().to_string()).collect());
        }

        let width = rows.iter().map(|row: &Vec<String>| row.len()).max().unwrap_or(0) as u32;

        Ok(Self { rows, width, filter })
    }
}

impl SheetReader for CsvSheetReader {
    fn highest_row(&self) -> u32 {
        let sheet_highest = self.rows.len() as u32;
        match self.filter {
            Some(range) => sheet_highest.min(range.end),
            None => sheet_highest,
        }
    }

    fn highest_column(&self) -> u32 {
        self.width
    }

    fn cell_value(&self, row: u32, col: u32) -> Value {
        if row == 0 || col == 0 {
            return Value::Null;
        }

        if let Some(filter) = self.filter {
            if !filter.admits(row) {
                return Value::Null;
            }
        }

        match self
            .rows
            .get((row - 1) as usize)
            .and_then(|cells| cells.get((col - 1) as usize))
        {
            Some(cell) if !cell.is_empty() => Value::String(cell.clone()),
            _ => Value::Null,
        }
    }
}
