//! Import orchestrator cycle tests over in-memory stores

mod common;

use std::sync::Arc;

use common::*;
use rowlift_server::import::jobs::ImportRowsJob;
use rowlift_server::import::pipeline::INVALID_DATE_FORMAT;
use rowlift_server::import::{CycleOutcome, ImportError, ImportOrchestrator, ModuleRegistry};
use rowlift_server::models::{FileCollection, ImportRecord, ImportStatus};
use rowlift_server::sheet::RowRange;
use rowlift_server::storage::FileStorage;
use rowlift_server::store::{ImportFileStore, ImportRecordStore};

struct Harness {
    records: Arc<MemoryRecordStore>,
    failed_rows: Arc<MemoryFailedRowStore>,
    files: Arc<MemoryFileStore>,
    storage: Arc<MemoryStorage>,
    queue: Arc<MemoryQueue>,
    module: Arc<TestModule>,
}

impl Harness {
    fn new(module: TestModule) -> Self {
        Self {
            records: Arc::new(MemoryRecordStore::new()),
            failed_rows: Arc::new(MemoryFailedRowStore::new()),
            files: Arc::new(MemoryFileStore::new()),
            storage: Arc::new(MemoryStorage::new()),
            queue: Arc::new(MemoryQueue::new()),
            module: Arc::new(module),
        }
    }

    fn orchestrator(&self, max_task_duration_secs: u64) -> ImportOrchestrator {
        let modules = Arc::new(ModuleRegistry::new().register(self.module.clone()));
        ImportOrchestrator::new(
            self.records.clone(),
            self.failed_rows.clone(),
            self.files.clone(),
            self.storage.clone(),
            self.queue.clone(),
            modules,
            max_task_duration_secs,
        )
    }

    /// Create a record and attach a csv source file for it.
    async fn seed(&self, csv: &str) -> ImportRecord {
        let record = self.records.create(TEST_MODULE_TYPE_ID, 7).await.unwrap();
        let key = format!("import-records/{}/upload_file/source.csv", record.id);
        self.storage
            .upload(&key, csv.as_bytes().to_vec(), Some("text/csv".to_string()))
            .await
            .unwrap();
        self.files
            .attach(record.id, FileCollection::UploadFile, &key, "source.csv")
            .await
            .unwrap();
        record
    }
}

const MIXED_CSV: &str = "\
First Name,Email
Ada,ada@example.com
Grace,bad-email
Lin,lin@example.com
";

#[tokio::test]
async fn test_full_cycle_with_one_failing_row() {
    let harness = Harness::new(TestModule::new());
    let record = harness.seed(MIXED_CSV).await;

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    let outcome = harness.orchestrator(3600).run_cycle(&job).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Completed);

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.status, ImportStatus::Completed);
    assert_eq!(record.total_records, 3);
    assert_eq!(record.records_imported, 2);
    assert_eq!(record.records_failed, 1);
    assert_eq!(record.header_columns(), vec!["first_name", "email"]);

    // The failed row carries row 3's raw fields and reasons.
    let failed = harness.failed_rows.rows_for(record.id);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].row_data.0.get("first_name"),
        Some(&serde_json::Value::from("Grace"))
    );
    assert_eq!(
        failed[0].fail_reasons.0,
        vec!["The email field must be a valid email address.".to_string()]
    );

    // Completion enqueued exactly one failure report job.
    let reports = harness.queue.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].record_id, record.id);

    assert_eq!(harness.module.saved().len(), 2);
    assert!(harness.queue.imports().is_empty());
}

#[tokio::test]
async fn test_counters_account_for_every_data_row() {
    let harness = Harness::new(TestModule::new());
    let mut csv = String::from("First Name,Email\n");
    for i in 0..25 {
        if i % 5 == 0 {
            csv.push_str(&format!("person{},missing-at-sign\n", i));
        } else {
            csv.push_str(&format!("person{},p{}@example.com\n", i, i));
        }
    }
    let record = harness.seed(&csv).await;

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    harness.orchestrator(3600).run_cycle(&job).await.unwrap();

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.total_records, 25);
    assert_eq!(record.records_imported + record.records_failed, 25);
    assert_eq!(record.records_failed, 5);
}

#[tokio::test]
async fn test_timestamp_serial_conversion_and_failure() {
    let harness = Harness::new(TestModule::new());
    // 45292.5 is 2024-01-01 12:00:00; the second row's serial is far out of
    // range and must fail with exactly one field-level error.
    let csv = "\
First Name,Email,Created At
Ada,ada@example.com,45292.5
Grace,grace@example.com,99999999999
Lin,lin@example.com,unparsed text
";
    let record = harness.seed(csv).await;

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    harness.orchestrator(3600).run_cycle(&job).await.unwrap();

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.records_imported, 2);
    assert_eq!(record.records_failed, 1);

    let saved = harness.module.saved();
    assert_eq!(
        saved[0].get("created_at"),
        Some(&serde_json::Value::from("2024-01-01 12:00:00"))
    );
    // Non-numeric values in timestamp columns pass through untouched.
    assert_eq!(
        saved[1].get("created_at"),
        Some(&serde_json::Value::from("unparsed text"))
    );

    let failed = harness.failed_rows.rows_for(record.id);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].fail_reasons.0, vec![INVALID_DATE_FORMAT.to_string()]);
}

#[tokio::test]
async fn test_continuation_ranges_partition_the_file() {
    let harness = Harness::new(TestModule::new());
    let mut csv = String::from("First Name,Email\n");
    for i in 0..5 {
        csv.push_str(&format!("person{},p{}@example.com\n", i, i));
    }
    let record = harness.seed(&csv).await;

    // Simulate a record whose first cycle already ran: totals and headers
    // are fixed, and the remaining rows arrive in negotiated ranges.
    harness.records.mark_in_progress(record.id, 5).await.unwrap();
    harness
        .records
        .save_header_columns(record.id, &["first_name".to_string(), "email".to_string()])
        .await
        .unwrap();

    let orchestrator = harness.orchestrator(3600);
    let job = ImportRowsJob {
        record_id: record.id,
        type_id: TEST_MODULE_TYPE_ID,
        start_row: Some(2),
        end_row: Some(3),
    };

    let outcome = orchestrator.run_cycle(&job).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Continued { next: RowRange::new(4, 5) }
    );

    let job = harness.queue.pop_import().unwrap();
    assert_eq!(job.row_range(), Some(RowRange::new(4, 5)));
    let outcome = orchestrator.run_cycle(&job).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Continued { next: RowRange::new(6, 6) }
    );

    let job = harness.queue.pop_import().unwrap();
    let outcome = orchestrator.run_cycle(&job).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Completed);

    // [2,3] + [4,5] + [6,6] covered every data row exactly once.
    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.records_imported, 5);
    assert_eq!(record.records_failed, 0);
    assert_eq!(record.status, ImportStatus::Completed);
}

#[tokio::test]
async fn test_expired_budget_stops_before_processing() {
    let harness = Harness::new(TestModule::new());
    let record = harness.seed(MIXED_CSV).await;

    // An already-expired budget must still mark the record in progress,
    // then hand off without touching any row.
    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    let outcome = harness.orchestrator(0).run_cycle(&job).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Continued { next: RowRange::new(1, 1) }
    );

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.status, ImportStatus::InProgress);
    assert_eq!(record.total_records, 3);
    assert_eq!(record.records_imported, 0);
    assert_eq!(record.records_failed, 0);
    assert!(record.header_columns().is_empty());

    let queued = harness.queue.imports();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].row_range(), Some(RowRange::new(1, 1)));
}

#[tokio::test]
async fn test_expiry_at_first_row_recovers_one_row_at_a_time() {
    let harness = Harness::new(TestModule::new());
    let record = harness.seed(MIXED_CSV).await;

    // First cycle expires instantly; the rest of the import proceeds in
    // single-row ranges until completion.
    harness
        .orchestrator(0)
        .run_cycle(&ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID))
        .await
        .unwrap();

    let orchestrator = harness.orchestrator(3600);
    let mut cycles = 0;
    while let Some(job) = harness.queue.pop_import() {
        orchestrator.run_cycle(&job).await.unwrap();
        cycles += 1;
        assert!(cycles < 20, "continuation chain did not terminate");
    }

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.status, ImportStatus::Completed);
    assert_eq!(record.records_imported, 2);
    assert_eq!(record.records_failed, 1);
    assert_eq!(record.header_columns(), vec!["first_name", "email"]);
    // Ranges were [1,1], [2,2], [3,3], [4,4].
    assert_eq!(cycles, 4);
}

#[tokio::test]
async fn test_range_including_header_row_skips_reprocessing() {
    let harness = Harness::new(TestModule::new());
    let record = harness.seed(MIXED_CSV).await;

    harness.records.mark_in_progress(record.id, 3).await.unwrap();
    harness
        .records
        .save_header_columns(record.id, &["first_name".to_string(), "email".to_string()])
        .await
        .unwrap();

    // A range that accidentally re-includes row 1 must not re-derive or
    // extend the header columns.
    let job = ImportRowsJob {
        record_id: record.id,
        type_id: TEST_MODULE_TYPE_ID,
        start_row: Some(1),
        end_row: Some(4),
    };
    let outcome = harness.orchestrator(3600).run_cycle(&job).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Completed);

    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.header_columns(), vec!["first_name", "email"]);
    assert_eq!(record.records_imported, 2);
    assert_eq!(record.records_failed, 1);
}

#[tokio::test]
async fn test_persistence_failure_is_fatal_to_the_cycle() {
    let harness = Harness::new(TestModule::failing());
    let record = harness.seed(MIXED_CSV).await;

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    let result = harness.orchestrator(3600).run_cycle(&job).await;
    assert!(matches!(result, Err(ImportError::Persistence(_))));

    // The record is left stalled in progress; no counters moved for the
    // in-flight row and no report job was scheduled.
    let record = harness.records.get(record.id).unwrap();
    assert_eq!(record.status, ImportStatus::InProgress);
    assert_eq!(record.records_imported, 0);
    assert!(harness.queue.reports().is_empty());
}

#[tokio::test]
async fn test_first_cycle_rejects_file_without_data_rows() {
    let harness = Harness::new(TestModule::new());
    let record = harness.seed("First Name,Email\n").await;

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    let result = harness.orchestrator(3600).run_cycle(&job).await;
    assert!(matches!(result, Err(ImportError::EmptyFile(_))));
}

#[tokio::test]
async fn test_unknown_module_fails_cycle() {
    let harness = Harness::new(TestModule::new());
    let record = harness.records.create(42, 7).await.unwrap();

    let job = ImportRowsJob::first_cycle(record.id, 42);
    let result = harness.orchestrator(3600).run_cycle(&job).await;
    assert!(matches!(result, Err(ImportError::UnknownModule(42))));
}

#[tokio::test]
async fn test_missing_source_file_fails_cycle() {
    let harness = Harness::new(TestModule::new());
    let record = harness.records.create(TEST_MODULE_TYPE_ID, 7).await.unwrap();

    let job = ImportRowsJob::first_cycle(record.id, TEST_MODULE_TYPE_ID);
    let result = harness.orchestrator(3600).run_cycle(&job).await;
    assert!(matches!(result, Err(ImportError::MissingSourceFile(_))));
}
