//! Row processing pipeline
//!
//! Per-row state machine: row 1 yields the normalized header columns, every
//! later row is mapped positionally into a field map, coerced, validated by
//! the import module, and either persisted (incrementing the imported
//! counter) or captured as a failed row (incrementing the failed counter).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use super::module::ImportModule;
use super::ImportError;
use crate::models::{FieldMap, ImportRecord};
use crate::sheet::{excel_serial_to_datetime, SheetReader};
use crate::store::{FailedRowStore, ImportRecordStore};

/// Header columns whose numeric values are spreadsheet date serials.
pub const TIMESTAMP_FIELDS: [&str; 3] = ["created_at", "updated_at", "original_created_at"];

/// Field-level error recorded when a date serial cannot be converted.
pub const INVALID_DATE_FORMAT: &str =
    "Specified date format is invalid. Please use the same format as mentioned";

/// Outcome of processing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Row 1 scanned and the header columns persisted.
    HeaderCaptured,
    /// Row 1 skipped because the header columns already exist.
    HeaderSkipped,
    /// Row validated and persisted.
    Imported,
    /// Row captured as a failed row.
    Failed,
}

/// Normalize a raw header cell into a field key: trim, lower-case, spaces
/// to underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

pub struct RowPipeline {
    module: Arc<dyn ImportModule>,
    headers: Vec<String>,
}

impl RowPipeline {
    /// Build a pipeline with the headers captured so far (empty on a first
    /// cycle that has not scanned row 1 yet).
    pub fn new(module: Arc<dyn ImportModule>, headers: Vec<String>) -> Self {
        Self { module, headers }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Process one row. Returns a cycle-fatal error only for persistence or
    /// store failures; validation problems are absorbed into failed rows.
    pub async fn process_row(
        &mut self,
        reader: &dyn SheetReader,
        row: u32,
        highest_column: u32,
        record: &ImportRecord,
        records: &dyn ImportRecordStore,
        failed_rows: &dyn FailedRowStore,
    ) -> Result<RowOutcome, ImportError> {
        if row == 1 {
            // A continuation whose range accidentally re-includes row 1
            // must not re-derive or duplicate headers.
            if !self.headers.is_empty() {
                return Ok(RowOutcome::HeaderSkipped);
            }

            self.capture_headers(reader, highest_column);
            records.save_header_columns(record.id, &self.headers).await?;
            debug!(record_id = record.id, columns = self.headers.len(), "Header columns captured");
            return Ok(RowOutcome::HeaderCaptured);
        }

        let (fields, mut errors) = self.collect_fields(reader, row, highest_column);
        errors.extend(self.module.validate(&fields));

        if errors.is_empty() {
            if let Err(source) = self.module.save(&fields, record).await {
                error!(
                    record_id = record.id,
                    row,
                    module = self.module.name(),
                    error = ?source,
                    "Import row persistence failed"
                );
                return Err(ImportError::Persistence(source));
            }

            records.increment_imported(record.id).await?;
            Ok(RowOutcome::Imported)
        } else {
            records.increment_failed(record.id).await?;
            failed_rows.append(record.id, &fields, &errors).await?;
            Ok(RowOutcome::Failed)
        }
    }

    /// Derive header columns from row 1. Blank cells are skipped, so the
    /// header list is the ordered set of populated columns.
    fn capture_headers(&mut self, reader: &dyn SheetReader, highest_column: u32) {
        for col in 1..=highest_column {
            if let Some(raw) = cell_to_string(&reader.cell_value(1, col)) {
                self.headers.push(normalize_header(&raw));
            }
        }
    }

    /// Map one data row into a field map keyed by header column, collecting
    /// field-level transform errors. Columns beyond the header list are
    /// dropped, matching the positional header-to-field contract.
    fn collect_fields(
        &self,
        reader: &dyn SheetReader,
        row: u32,
        highest_column: u32,
    ) -> (FieldMap, Vec<String>) {
        let mut fields = FieldMap::new();
        let mut errors = Vec::new();

        for col in 1..=highest_column {
            let Some(key) = self.headers.get((col - 1) as usize) else {
                continue;
            };

            let mut value = reader.cell_value(row, col);

            if TIMESTAMP_FIELDS.contains(&key.as_str()) {
                if let Some(serial) = numeric_value(&value) {
                    match excel_serial_to_datetime(serial) {
                        Some(dt) => {
                            value = Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string());
                        },
                        None => errors.push(INVALID_DATE_FORMAT.to_string()),
                    }
                }
            }

            fields.insert(key.clone(), value);
        }

        (fields, errors)
    }
}

/// Non-blank string rendering of a header cell.
fn cell_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        },
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric reading of a cell, accepting numbers and numeric strings.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
