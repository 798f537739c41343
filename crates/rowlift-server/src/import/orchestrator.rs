//! Import orchestrator
//!
//! Sequences one resumable cycle: deadline computation, reader setup,
//! the Pending -> InProgress -> Completed state machine, the row loop, and
//! the continuation handoff when the budget or the assigned range runs out.

use std::sync::Arc;

use tracing::{info, instrument};

use super::budget::TimeBudget;
use super::jobs::{FailedRowsReportJob, ImportRowsJob, JobQueue};
use super::module::ModuleRegistry;
use super::pipeline::RowPipeline;
use super::scheduler;
use super::ImportError;
use crate::models::FileCollection;
use crate::sheet::{self, RowRange};
use crate::storage::FileStorage;
use crate::store::{FailedRowStore, ImportFileStore, ImportRecordStore};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle stopped and enqueued a continuation over `next`.
    Continued { next: RowRange },
    /// All rows scanned; the record is Completed and the failure report job
    /// has been enqueued.
    Completed,
}

pub struct ImportOrchestrator {
    records: Arc<dyn ImportRecordStore>,
    failed_rows: Arc<dyn FailedRowStore>,
    files: Arc<dyn ImportFileStore>,
    storage: Arc<dyn FileStorage>,
    queue: Arc<dyn JobQueue>,
    modules: Arc<ModuleRegistry>,
    max_task_duration_secs: u64,
}

impl ImportOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        records: Arc<dyn ImportRecordStore>,
        failed_rows: Arc<dyn FailedRowStore>,
        files: Arc<dyn ImportFileStore>,
        storage: Arc<dyn FileStorage>,
        queue: Arc<dyn JobQueue>,
        modules: Arc<ModuleRegistry>,
        max_task_duration_secs: u64,
    ) -> Self {
        Self {
            records,
            failed_rows,
            files,
            storage,
            queue,
            modules,
            max_task_duration_secs,
        }
    }

    /// Run one cycle over the job's assigned row range.
    ///
    /// Counters committed for rows already processed stay durable even when
    /// a later row fails the cycle; no automatic resume is scheduled for a
    /// failed cycle.
    #[instrument(skip(self), fields(record_id = job.record_id, start_row = job.start_row, end_row = job.end_row))]
    pub async fn run_cycle(&self, job: &ImportRowsJob) -> Result<CycleOutcome, ImportError> {
        let budget = TimeBudget::start(self.max_task_duration_secs);

        let record = self.records.by_id(job.record_id).await?;
        let module = self
            .modules
            .by_type(record.type_id)
            .ok_or(ImportError::UnknownModule(record.type_id))?;

        let source = self
            .files
            .first_for(record.id, FileCollection::UploadFile)
            .await?
            .ok_or(ImportError::MissingSourceFile(record.id))?;
        let local_path = self
            .storage
            .fetch_to_local(&source.storage_key, &source.file_name)
            .await?;

        let range = job.row_range();
        let reader = sheet::open(&local_path, range)?;
        let highest_row = reader.highest_row();
        let highest_column = reader.highest_column();

        let mut total_records = record.total_records.max(0) as u32;
        if job.is_first_cycle() {
            if highest_row <= 1 {
                return Err(ImportError::EmptyFile(record.id));
            }

            // total_records is fixed here and never recomputed by
            // continuation cycles.
            total_records = highest_row - 1;
            self.records
                .mark_in_progress(record.id, total_records as i32)
                .await?;
            info!(record_id = record.id, total_records, "Import record marked in progress");
        }

        let mut pipeline = RowPipeline::new(module, record.header_columns());
        let start_row = range.map(|r| r.start).unwrap_or(1);

        let mut row = start_row;
        while row <= highest_row {
            if budget.is_expired() {
                // The row at the cursor has not been processed; the
                // continuation picks it up.
                return self.continue_from(job, row, range, total_records).await;
            }

            pipeline
                .process_row(
                    reader.as_ref(),
                    row,
                    highest_column,
                    &record,
                    self.records.as_ref(),
                    self.failed_rows.as_ref(),
                )
                .await?;

            row += 1;
        }

        if scheduler::rows_remain_after(highest_row, total_records) {
            // Assigned range drained with rows left in the file.
            return self
                .continue_from(job, highest_row + 1, range, total_records)
                .await;
        }

        self.records.mark_completed(record.id).await?;
        self.queue
            .enqueue_report(FailedRowsReportJob { record_id: record.id })
            .await?;
        info!(record_id = record.id, "Import record completed");

        Ok(CycleOutcome::Completed)
    }

    async fn continue_from(
        &self,
        job: &ImportRowsJob,
        resume_at: u32,
        current_range: Option<RowRange>,
        total_records: u32,
    ) -> Result<CycleOutcome, ImportError> {
        let end = scheduler::next_end_row(resume_at, current_range, total_records);
        let next = RowRange::new(resume_at, end);

        self.queue.enqueue_import(job.continuation(next)).await?;
        info!(
            record_id = job.record_id,
            start_row = next.start,
            end_row = next.end,
            "Cycle stopped, continuation enqueued"
        );

        Ok(CycleOutcome::Continued { next })
    }
}
