//! In-memory fakes of the store, queue, and storage contracts shared by the
//! integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rowlift_common::types::Pagination;
use sqlx::types::Json;

use rowlift_server::db::{DbError, DbResult};
use rowlift_server::import::jobs::{FailedRowsReportJob, ImportRowsJob, JobQueue, QueueError};
use rowlift_server::import::ImportModule;
use rowlift_server::models::{
    FieldMap, FileCollection, ImportRecord, ImportRecordFailedRow, ImportRecordFile, ImportStatus,
};
use rowlift_server::storage::{FileStorage, StorageError, UploadResult};
use rowlift_server::store::{FailedRowStore, ImportFileStore, ImportRecordStore};

// ============================================================================
// Record store
// ============================================================================

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<i64, ImportRecord>>,
    next_id: AtomicI64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<ImportRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    fn update<F: FnOnce(&mut ImportRecord)>(&self, id: i64, mutate: F) -> DbResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("import record", &id.to_string()))?;
        mutate(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ImportRecordStore for MemoryRecordStore {
    async fn create(&self, type_id: i16, created_by_id: i64) -> DbResult<ImportRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = ImportRecord {
            id,
            type_id,
            created_by_id,
            columns: None,
            status: ImportStatus::Pending,
            total_records: 0,
            records_imported: 0,
            records_failed: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.records.lock().unwrap().insert(id, record.clone());
        Ok(record)
    }

    async fn by_id(&self, id: i64) -> DbResult<ImportRecord> {
        self.get(id)
            .ok_or_else(|| DbError::not_found("import record", &id.to_string()))
    }

    async fn list(&self, page: Pagination) -> DbResult<Vec<ImportRecord>> {
        let mut records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn save_header_columns(&self, id: i64, columns: &[String]) -> DbResult<()> {
        self.update(id, |record| record.columns = Some(Json(columns.to_vec())))
    }

    async fn mark_in_progress(&self, id: i64, total_records: i32) -> DbResult<()> {
        self.update(id, |record| {
            record.status = ImportStatus::InProgress;
            record.total_records = total_records;
        })
    }

    async fn increment_imported(&self, id: i64) -> DbResult<()> {
        self.update(id, |record| record.records_imported += 1)
    }

    async fn increment_failed(&self, id: i64) -> DbResult<()> {
        self.update(id, |record| record.records_failed += 1)
    }

    async fn mark_completed(&self, id: i64) -> DbResult<()> {
        self.update(id, |record| record.status = ImportStatus::Completed)
    }
}

// ============================================================================
// Failed row store
// ============================================================================

#[derive(Default)]
pub struct MemoryFailedRowStore {
    rows: Mutex<Vec<ImportRecordFailedRow>>,
    next_id: AtomicI64,
}

impl MemoryFailedRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_for(&self, import_record_id: i64) -> Vec<ImportRecordFailedRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.import_record_id == import_record_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FailedRowStore for MemoryFailedRowStore {
    async fn append(
        &self,
        import_record_id: i64,
        row_data: &FieldMap,
        fail_reasons: &[String],
    ) -> DbResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().unwrap().push(ImportRecordFailedRow {
            id,
            import_record_id,
            row_data: Json(row_data.clone()),
            fail_reasons: Json(fail_reasons.to_vec()),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn all_for(&self, import_record_id: i64) -> DbResult<Vec<ImportRecordFailedRow>> {
        Ok(self.rows_for(import_record_id))
    }

    async fn delete_all_for(&self, import_record_id: i64) -> DbResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.import_record_id != import_record_id);
        Ok((before - rows.len()) as u64)
    }
}

// ============================================================================
// File attachment store
// ============================================================================

#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<ImportRecordFile>>,
    next_id: AtomicI64,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImportFileStore for MemoryFileStore {
    async fn attach(
        &self,
        import_record_id: i64,
        collection: FileCollection,
        storage_key: &str,
        file_name: &str,
    ) -> DbResult<ImportRecordFile> {
        let mut files = self.files.lock().unwrap();

        if files
            .iter()
            .any(|f| f.import_record_id == import_record_id && f.collection == collection.as_str())
        {
            return Err(DbError::duplicate(
                "import record file",
                &format!("{}/{}", import_record_id, collection),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let file = ImportRecordFile {
            id,
            import_record_id,
            collection: collection.as_str().to_string(),
            storage_key: storage_key.to_string(),
            file_name: file_name.to_string(),
            created_at: Utc::now(),
        };
        files.push(file.clone());
        Ok(file)
    }

    async fn first_for(
        &self,
        import_record_id: i64,
        collection: FileCollection,
    ) -> DbResult<Option<ImportRecordFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.import_record_id == import_record_id && f.collection == collection.as_str())
            .cloned())
    }
}

// ============================================================================
// Object storage
// ============================================================================

pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    scratch: tempfile::TempDir,
    fail_uploads: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            scratch: tempfile::tempdir().unwrap(),
            fail_uploads: false,
        }
    }

    /// A storage fake whose uploads always fail.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: Option<String>,
    ) -> Result<UploadResult, StorageError> {
        if self.fail_uploads {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "storage unavailable".to_string(),
            });
        }

        let checksum = rowlift_common::checksum::sha256_hex(&data);
        let size = data.len() as i64;
        self.objects.lock().unwrap().insert(key.to_string(), data);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(key).ok_or_else(|| StorageError::Download {
            key: key.to_string(),
            message: "object not found".to_string(),
        })
    }

    async fn fetch_to_local(&self, key: &str, file_name: &str) -> Result<PathBuf, StorageError> {
        let data = self.download(key).await?;
        let path = self.scratch.path().join(format!(
            "{}-{}",
            self.objects.lock().unwrap().len(),
            file_name
        ));
        std::fs::write(&path, data)?;
        Ok(path)
    }

    async fn download_url(
        &self,
        key: &str,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("memory://{}", key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Job queue
// ============================================================================

#[derive(Default)]
pub struct MemoryQueue {
    imports: Mutex<Vec<ImportRowsJob>>,
    reports: Mutex<Vec<FailedRowsReportJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imports(&self) -> Vec<ImportRowsJob> {
        self.imports.lock().unwrap().clone()
    }

    /// Pop the oldest queued import job, for driving continuation chains.
    pub fn pop_import(&self) -> Option<ImportRowsJob> {
        let mut imports = self.imports.lock().unwrap();
        if imports.is_empty() {
            None
        } else {
            Some(imports.remove(0))
        }
    }

    pub fn reports(&self) -> Vec<FailedRowsReportJob> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue_import(&self, job: ImportRowsJob) -> Result<(), QueueError> {
        self.imports.lock().unwrap().push(job);
        Ok(())
    }

    async fn enqueue_report(&self, job: FailedRowsReportJob) -> Result<(), QueueError> {
        self.reports.lock().unwrap().push(job);
        Ok(())
    }
}

// ============================================================================
// Test import module
// ============================================================================

/// Type id used by [`TestModule`].
pub const TEST_MODULE_TYPE_ID: i16 = 9;

/// Module requiring a first name and a well-formed email; accepted rows are
/// collected in memory.
#[derive(Default)]
pub struct TestModule {
    saved: Mutex<Vec<FieldMap>>,
    fail_saves: bool,
}

impl TestModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// A module whose persist operation always raises.
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail_saves: true,
        }
    }

    pub fn saved(&self) -> Vec<FieldMap> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportModule for TestModule {
    fn type_id(&self) -> i16 {
        TEST_MODULE_TYPE_ID
    }

    fn name(&self) -> &str {
        "test-contacts"
    }

    fn expected_columns(&self) -> &[&str] {
        &["first_name", "email"]
    }

    fn validate(&self, fields: &FieldMap) -> Vec<String> {
        let mut errors = Vec::new();

        match fields.get("first_name") {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {},
            _ => errors.push("The first name field is required.".to_string()),
        }

        match fields.get("email") {
            Some(serde_json::Value::String(s)) if s.contains('@') => {},
            _ => errors.push("The email field must be a valid email address.".to_string()),
        }

        errors
    }

    async fn save(&self, fields: &FieldMap, _record: &ImportRecord) -> anyhow::Result<()> {
        if self.fail_saves {
            anyhow::bail!("contacts table unavailable");
        }
        self.saved.lock().unwrap().push(fields.clone());
        Ok(())
    }
}
