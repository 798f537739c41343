//! Durable stores for import records, failed rows, and file attachments
//!
//! The import engine only mutates state through these narrow operations.
//! Counter updates are single-row atomic SQL increments so a crashed cycle
//! can never double-count or lose an increment on restart.

use async_trait::async_trait;
use rowlift_common::types::Pagination;

use crate::db::DbResult;
use crate::models::{
    FieldMap, FileCollection, ImportRecord, ImportRecordFailedRow, ImportRecordFile,
};

mod failed_rows;
mod files;
mod import_records;

pub use failed_rows::PgFailedRowStore;
pub use files::PgImportFileStore;
pub use import_records::PgImportRecordStore;

/// Status and counter mutations for import records.
#[async_trait]
pub trait ImportRecordStore: Send + Sync {
    /// Create a new Pending record.
    async fn create(&self, type_id: i16, created_by_id: i64) -> DbResult<ImportRecord>;

    async fn by_id(&self, id: i64) -> DbResult<ImportRecord>;

    /// Newest-first listing for operator tooling.
    async fn list(&self, page: Pagination) -> DbResult<Vec<ImportRecord>>;

    /// Persist the derived header columns. Called once, after row 1 of the
    /// first cycle has been scanned.
    async fn save_header_columns(&self, id: i64, columns: &[String]) -> DbResult<()>;

    /// Transition Pending -> InProgress and fix `total_records`.
    async fn mark_in_progress(&self, id: i64, total_records: i32) -> DbResult<()>;

    /// Atomically add one to `records_imported`.
    async fn increment_imported(&self, id: i64) -> DbResult<()>;

    /// Atomically add one to `records_failed`.
    async fn increment_failed(&self, id: i64) -> DbResult<()>;

    /// Transition InProgress -> Completed.
    async fn mark_completed(&self, id: i64) -> DbResult<()>;
}

/// Persistence for rows that failed validation.
#[async_trait]
pub trait FailedRowStore: Send + Sync {
    async fn append(
        &self,
        import_record_id: i64,
        row_data: &FieldMap,
        fail_reasons: &[String],
    ) -> DbResult<()>;

    async fn all_for(&self, import_record_id: i64) -> DbResult<Vec<ImportRecordFailedRow>>;

    /// Bulk-delete all failed rows for a record, returning the count.
    /// Only called after the failure report artifact exists.
    async fn delete_all_for(&self, import_record_id: i64) -> DbResult<u64>;
}

/// Storage attachments for import records.
#[async_trait]
pub trait ImportFileStore: Send + Sync {
    /// Attach a stored file under a collection. Fails with a duplicate
    /// error when the collection already holds a file for this record.
    async fn attach(
        &self,
        import_record_id: i64,
        collection: FileCollection,
        storage_key: &str,
        file_name: &str,
    ) -> DbResult<ImportRecordFile>;

    async fn first_for(
        &self,
        import_record_id: i64,
        collection: FileCollection,
    ) -> DbResult<Option<ImportRecordFile>>;
}
