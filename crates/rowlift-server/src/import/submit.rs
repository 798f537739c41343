//! Import submission
//!
//! Creates the Pending record, uploads the source file, and pre-validates
//! the file before the first task is enqueued. A rejected submission leaves
//! the record Pending and enqueues nothing.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use rowlift_common::checksum::sha256_hex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::jobs::{ImportRowsJob, JobQueue, QueueError};
use super::module::ModuleRegistry;
use super::pipeline::normalize_header;
use crate::db::DbError;
use crate::models::FileCollection;
use crate::sheet::{self, SheetError, SheetReader};
use crate::storage::{self, FileStorage, StorageError};
use crate::store::{ImportFileStore, ImportRecordStore};

/// Submission rejections and failures
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The file's header row is missing columns the module requires.
    #[error("Columns do not match with the sample file.")]
    HeaderMismatch { missing: Vec<String> },

    /// The file holds a header row only.
    #[error("The uploaded file is empty.")]
    EmptyFile,

    #[error("No import module registered for type id {0}")]
    UnknownModule(i16),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Successful submission response.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub record_id: i64,
    pub message: String,
}

pub struct ImportSubmission {
    records: Arc<dyn ImportRecordStore>,
    files: Arc<dyn ImportFileStore>,
    storage: Arc<dyn FileStorage>,
    queue: Arc<dyn JobQueue>,
    modules: Arc<ModuleRegistry>,
}

impl ImportSubmission {
    pub fn new(
        records: Arc<dyn ImportRecordStore>,
        files: Arc<dyn ImportFileStore>,
        storage: Arc<dyn FileStorage>,
        queue: Arc<dyn JobQueue>,
        modules: Arc<ModuleRegistry>,
    ) -> Self {
        Self {
            records,
            files,
            storage,
            queue,
            modules,
        }
    }

    /// Submit a tabular file for import under the given module type.
    #[instrument(skip(self, path))]
    pub async fn submit(
        &self,
        path: &Path,
        file_name: &str,
        type_id: i16,
        created_by_id: i64,
    ) -> Result<SubmitReceipt, SubmitError> {
        let module = self
            .modules
            .by_type(type_id)
            .ok_or(SubmitError::UnknownModule(type_id))?;

        let record = self.records.create(type_id, created_by_id).await?;

        let data = tokio::fs::read(path).await?;
        let checksum = sha256_hex(&data);
        let key = storage::source_file_key(record.id, file_name);

        self.storage
            .upload(&key, data, storage::content_type_for(file_name))
            .await?;
        self.files
            .attach(record.id, FileCollection::UploadFile, &key, file_name)
            .await?;

        info!(
            record_id = record.id,
            file = file_name,
            %checksum,
            "Import file uploaded"
        );

        let reader = sheet::open(path, None)?;

        let missing = missing_columns(module.expected_columns(), reader.as_ref());
        if !missing.is_empty() {
            warn!(record_id = record.id, ?missing, "Submission rejected: header mismatch");
            return Err(SubmitError::HeaderMismatch { missing });
        }

        if reader.highest_row() <= 1 {
            warn!(record_id = record.id, "Submission rejected: no data rows");
            return Err(SubmitError::EmptyFile);
        }

        self.queue
            .enqueue_import(ImportRowsJob::first_cycle(record.id, type_id))
            .await?;

        info!(record_id = record.id, "Import started");

        Ok(SubmitReceipt {
            record_id: record.id,
            message: "Import started successfully.".to_string(),
        })
    }
}

/// Expected columns absent from the file's normalized header row.
fn missing_columns(expected: &[&str], reader: &dyn SheetReader) -> Vec<String> {
    let mut found = HashSet::new();
    for col in 1..=reader.highest_column() {
        let value = reader.cell_value(1, col);
        if let Some(raw) = value.as_str() {
            found.insert(normalize_header(raw));
        }
    }

    expected
        .iter()
        .filter(|column| !found.contains(**column))
        .map(|column| column.to_string())
        .collect()
}
