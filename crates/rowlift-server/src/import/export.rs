//! Failure export subsystem
//!
//! After a record completes, failed rows are materialized into a
//! downloadable report and then purged. The report artifact must exist
//! durably before any failed row is deleted.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument};

use super::ImportError;
use crate::models::{FileCollection, ImportRecordFile};
use crate::sheet::ReportWriter;
use crate::storage::{self, FileStorage};
use crate::store::{FailedRowStore, ImportFileStore, ImportRecordStore};

/// Synthetic report column holding the joined fail reasons.
pub const FAILED_REASONS_COLUMN: &str = "Failed Reasons";

pub struct FailureExporter {
    records: Arc<dyn ImportRecordStore>,
    failed_rows: Arc<dyn FailedRowStore>,
    files: Arc<dyn ImportFileStore>,
    storage: Arc<dyn FileStorage>,
}

impl FailureExporter {
    pub fn new(
        records: Arc<dyn ImportRecordStore>,
        failed_rows: Arc<dyn FailedRowStore>,
        files: Arc<dyn ImportFileStore>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            records,
            failed_rows,
            files,
            storage,
        }
    }

    /// Generate the failure report for a completed record.
    ///
    /// No-op when the record has no failed rows. Safe under at-least-once
    /// job delivery: if the artifact already exists, only the purge is
    /// repeated. Failed rows are deleted strictly after the artifact has
    /// been stored and attached.
    #[instrument(skip(self))]
    pub async fn generate(&self, record_id: i64) -> Result<Option<ImportRecordFile>, ImportError> {
        let record = self.records.by_id(record_id).await?;

        if record.records_failed == 0 {
            info!(record_id, "No failed records, skipping failure report");
            return Ok(None);
        }

        if let Some(existing) = self
            .files
            .first_for(record_id, FileCollection::FailedRowsFile)
            .await?
        {
            // A prior delivery produced the artifact but may have died
            // before purging.
            let deleted = self.failed_rows.delete_all_for(record_id).await?;
            info!(record_id, deleted, "Failure report already exists, purged remaining rows");
            return Ok(Some(existing));
        }

        let headers = record.header_columns();
        let failed = self.failed_rows.all_for(record_id).await?;

        let mut grid = Vec::with_capacity(failed.len() + 1);
        let mut heading = headers.clone();
        heading.push(FAILED_REASONS_COLUMN.to_string());
        grid.push(heading);

        for row in &failed {
            let mut cells: Vec<String> = headers
                .iter()
                .map(|header| display_cell(row.row_data.0.get(header)))
                .collect();
            cells.push(row.fail_reasons.0.join(", "));
            grid.push(cells);
        }

        let mut writer = ReportWriter::new();
        writer.write_grid(grid);
        let bytes = writer.into_bytes()?;

        let file_name = format!("{}.csv", Utc::now().format("%y-%m-%d-%H-%M-%S"));
        let key = storage::failed_report_key(record_id, &file_name);

        let upload = self
            .storage
            .upload(&key, bytes, Some("text/csv".to_string()))
            .await?;
        let attached = self
            .files
            .attach(record_id, FileCollection::FailedRowsFile, &key, &file_name)
            .await?;

        let deleted = self.failed_rows.delete_all_for(record_id).await?;

        info!(
            record_id,
            key = %upload.key,
            checksum = %upload.checksum,
            rows = failed.len(),
            deleted,
            "Failure report generated"
        );

        Ok(Some(attached))
    }
}

/// Render a raw field value as a report cell.
fn display_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
