//! Xlsx reader backed by calamine

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde_json::Value;
use std::path::Path;

use super::{RowRange, SheetError, SheetReader};

/// Random-access reader over the first worksheet of an xlsx workbook.
///
/// The whole worksheet is loaded into memory; the row filter is applied at
/// access time so filtered cells read as empty.
pub struct XlsxSheetReader {
    range: Range<Data>,
    filter: Option<RowRange>,
}

impl XlsxSheetReader {
    pub fn open(path: &Path, filter: Option<RowRange>) -> Result<Self, SheetError> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| SheetError::Workbook(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(SheetError::Workbook("workbook has no worksheets".to_string()));
        }

        let sheet_name = sheet_names[0].clone();
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| SheetError::Workbook(e.to_string()))?;

        Ok(Self { range, filter })
    }
}

impl SheetReader for XlsxSheetReader {
    fn highest_row(&self) -> u32 {
        let sheet_highest = self.range.end().map(|(row, _)| row + 1).unwrap_or(0);
        match self.filter {
            Some(range) => sheet_highest.min(range.end),
            None => sheet_highest,
        }
    }

    fn highest_column(&self) -> u32 {
        self.range.end().map(|(_, col)| col + 1).unwrap_or(0)
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

        match self.range.get_value((row - 1, col - 1)) {
            Some(data) => data_to_value(data),
            None => Value::Null,
        }
    }
}

/// Map a calamine cell to a JSON value. Date cells surface their raw
/// spreadsheet serial; timestamp coercion happens in the row pipeline.
fn data_to_value(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Null,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        },
        Data::Float(f) => Value::from(*f),
        Data::Int(i) => Value::from(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::from(dt.as_f64()),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_to_value_strings() {
        assert_eq!(data_to_value(&Data::String("  hello ".to_string())), Value::from("hello"));
        assert_eq!(data_to_value(&Data::String("   ".to_string())), Value::Null);
        assert_eq!(data_to_value(&Data::Empty), Value::Null);
    }

    #[test]
    fn test_data_to_value_numbers() {
        assert_eq!(data_to_value(&Data::Int(42)), Value::from(42));
        assert_eq!(data_to_value(&Data::Float(2.5)), Value::from(2.5));
        assert_eq!(data_to_value(&Data::Bool(true)), Value::Bool(true));
    }

    #[test]
    fn test_open_missing_workbook() {
        let result = XlsxSheetReader::open(Path::new("missing.xlsx"), None);
        assert!(matches!(result, Err(SheetError::Workbook(_))));
    }
}
