//! Database models for import records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Raw field map for a single data row, keyed by normalized header column.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of an import record.
///
/// Stored as a smallint: 1 = Pending, 2 = InProgress, 3 = Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum ImportStatus {
    Pending = 1,
    InProgress = 2,
    Completed = 3,
}

/// One submitted file import.
///
/// Counters are mutated only through the record store's atomic single-row
/// updates; `total_records` is fixed on the first cycle and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportRecord {
    pub id: i64,
    pub type_id: i16,
    pub created_by_id: i64,
    /// Ordered normalized header columns, unset until the first cycle
    /// has scanned row 1.
    pub columns: Option<Json<Vec<String>>>,
    pub status: ImportStatus,
    pub total_records: i32,
    pub records_imported: i32,
    pub records_failed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportRecord {
    /// The persisted header columns, empty when not yet derived.
    pub fn header_columns(&self) -> Vec<String> {
        self.columns
            .as_ref()
            .map(|columns| columns.0.clone())
            .unwrap_or_default()
    }
}

/// A data row that failed validation, kept until the failure report
/// artifact has been generated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportRecordFailedRow {
    pub id: i64,
    pub import_record_id: i64,
    pub row_data: Json<FieldMap>,
    pub fail_reasons: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Storage collections a file can be attached under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCollection {
    /// The submitted source file.
    UploadFile,
    /// The generated failure report.
    FailedRowsFile,
}

impl FileCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCollection::UploadFile => "upload_file",
            FileCollection::FailedRowsFile => "failed_rows_file",
        }
    }
}

impl std::fmt::Display for FileCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage attachment for an import record, at most one per collection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportRecordFile {
    pub id: i64,
    pub import_record_id: i64,
    pub collection: String,
    pub storage_key: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}
