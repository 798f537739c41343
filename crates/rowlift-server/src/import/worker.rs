//! Apalis worker wiring
//!
//! Binds the import and report jobs to Postgres-backed apalis workers and
//! adapts the apalis storages to the [`JobQueue`] enqueue contract.

use std::sync::Arc;

use anyhow::Result;
use apalis::prelude::*;
use apalis_postgres::PostgresStorage;
use async_trait::async_trait;
use tracing::{error, info};

use super::export::FailureExporter;
use super::jobs::{FailedRowsReportJob, ImportRowsJob, JobQueue, QueueError};
use super::module::ModuleRegistry;
use super::orchestrator::ImportOrchestrator;
use super::ImportError;
use crate::storage::FileStorage;
use crate::store::{FailedRowStore, ImportFileStore, ImportRecordStore};

/// Shared dependencies injected into job handlers.
pub struct WorkerContext {
    pub records: Arc<dyn ImportRecordStore>,
    pub failed_rows: Arc<dyn FailedRowStore>,
    pub files: Arc<dyn ImportFileStore>,
    pub storage: Arc<dyn FileStorage>,
    pub queue: Arc<dyn JobQueue>,
    pub modules: Arc<ModuleRegistry>,
    pub max_task_duration_secs: u64,
}

impl WorkerContext {
    pub fn orchestrator(&self) -> ImportOrchestrator {
        ImportOrchestrator::new(
            self.records.clone(),
            self.failed_rows.clone(),
            self.files.clone(),
            self.storage.clone(),
            self.queue.clone(),
            self.modules.clone(),
            self.max_task_duration_secs,
        )
    }

    pub fn exporter(&self) -> FailureExporter {
        FailureExporter::new(
            self.records.clone(),
            self.failed_rows.clone(),
            self.files.clone(),
            self.storage.clone(),
        )
    }
}

/// [`JobQueue`] adapter over the apalis Postgres storages.
#[derive(Clone)]
pub struct ApalisQueue {
    imports: PostgresStorage<ImportRowsJob>,
    reports: PostgresStorage<FailedRowsReportJob>,
}

impl ApalisQueue {
    pub fn new(
        imports: PostgresStorage<ImportRowsJob>,
        reports: PostgresStorage<FailedRowsReportJob>,
    ) -> Self {
        Self { imports, reports }
    }
}

#[async_trait]
impl JobQueue for ApalisQueue {
    async fn enqueue_import(&self, job: ImportRowsJob) -> Result<(), QueueError> {
        self.imports
            .clone()
            .push(job)
            .await
            .map(|_| ())
            .map_err(|e| QueueError::Enqueue(e.to_string()))
    }

    async fn enqueue_report(&self, job: FailedRowsReportJob) -> Result<(), QueueError> {
        self.reports
            .clone()
            .push(job)
            .await
            .map(|_| ())
            .map_err(|e| QueueError::Enqueue(e.to_string()))
    }
}

/// Runs the apalis monitor with import and report workers.
pub struct JobScheduler {
    ctx: Arc<WorkerContext>,
    imports: PostgresStorage<ImportRowsJob>,
    reports: PostgresStorage<FailedRowsReportJob>,
    worker_count: usize,
}

impl JobScheduler {
    pub fn new(
        ctx: Arc<WorkerContext>,
        imports: PostgresStorage<ImportRowsJob>,
        reports: PostgresStorage<FailedRowsReportJob>,
        worker_count: usize,
    ) -> Self {
        Self {
            ctx,
            imports,
            reports,
            worker_count,
        }
    }

    /// Run the workers until the monitor stops.
    pub async fn run(self) -> Result<()> {
        info!(workers = self.worker_count, "Starting job workers");

        let mut monitor = Monitor::new();

        for index in 0..self.worker_count {
            let ctx = self.ctx.clone();
            let backend = self.imports.clone();
            monitor = monitor.register(move |_i| {
                WorkerBuilder::new(format!("rowlift-import-worker-{index}"))
                    .backend(backend.clone())
                    .data(ctx.clone())
                    .build(run_import_job)
            });

            let ctx = self.ctx.clone();
            let backend = self.reports.clone();
            monitor = monitor.register(move |_i| {
                WorkerBuilder::new(format!("rowlift-report-worker-{index}"))
                    .backend(backend.clone())
                    .data(ctx.clone())
                    .build(run_report_job)
            });
        }

        monitor.run().await?;

        info!("Job workers stopped");

        Ok(())
    }
}

/// Execute one import cycle job.
async fn run_import_job(
    job: ImportRowsJob,
    ctx: Data<Arc<WorkerContext>>,
) -> Result<(), ImportError> {
    match ctx.orchestrator().run_cycle(&job).await {
        Ok(_outcome) => Ok(()),
        Err(e) => {
            // Fail the task loudly; the record stays InProgress until an
            // operator resubmits it.
            error!(
                record_id = job.record_id,
                start_row = ?job.start_row,
                end_row = ?job.end_row,
                error = ?e,
                "Import cycle failed"
            );
            Err(e)
        },
    }
}

/// Execute one failure report job.
async fn run_report_job(
    job: FailedRowsReportJob,
    ctx: Data<Arc<WorkerContext>>,
) -> Result<(), ImportError> {
    match ctx.exporter().generate(job.record_id).await {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(record_id = job.record_id, error = ?e, "Failure report job failed");
            Err(e)
        },
    }
}
