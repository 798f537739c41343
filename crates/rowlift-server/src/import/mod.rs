//! Time-budgeted import engine
//!
//! Converts each row of a submitted tabular file into a validated, persisted
//! record, under a strict per-task execution-time budget.
//!
//! A single file may hold far more rows than one queue task can process
//! before the queue's hard timeout. Each cycle therefore computes a deadline
//! at 80% of the configured task duration, processes rows until the deadline
//! or the end of its assigned row range, and hands off the remainder by
//! enqueuing a continuation job carrying the next inclusive row range.
//! Counters are committed per row with atomic single-row updates, so a
//! mid-cycle crash loses at most the in-flight row.
//!
//! # Components
//!
//! - **budget**: deadline computation and expiry checks
//! - **scheduler**: continuation trigger math and next-range computation
//! - **module**: the pluggable per-import-type validate/persist contract
//! - **pipeline**: header discovery and per-row transform/validate/persist
//! - **orchestrator**: one resumable cycle; owns the record state machine
//! - **export**: post-completion failure report generation
//! - **submit**: submission pre-validation and first job enqueue
//! - **jobs**: queue payloads and the enqueue contract
//! - **worker**: apalis worker wiring

use thiserror::Error;

use crate::db::DbError;
use crate::import::jobs::QueueError;
use crate::sheet::SheetError;
use crate::storage::StorageError;

pub mod budget;
pub mod export;
pub mod jobs;
pub mod module;
pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;
pub mod submit;
pub mod worker;

pub use export::FailureExporter;
pub use jobs::{FailedRowsReportJob, ImportRowsJob, JobQueue};
pub use module::{ImportModule, ModuleRegistry};
pub use orchestrator::{CycleOutcome, ImportOrchestrator};
pub use pipeline::RowPipeline;
pub use submit::{ImportSubmission, SubmitError, SubmitReceipt};
pub use worker::{ApalisQueue, JobScheduler, WorkerContext};

/// Cycle-level failures. Row-level validation problems are not errors; they
/// are captured as failed rows and the cycle continues.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("No import module registered for type id {0}")]
    UnknownModule(i16),

    #[error("Import record {0} has no uploaded source file")]
    MissingSourceFile(i64),

    #[error("Import record {0} points at a file with no data rows")]
    EmptyFile(i64),

    /// A module's persist operation raised. Fatal to the cycle; retry policy
    /// is delegated to the surrounding task queue.
    #[error("Module persistence failed: {0}")]
    Persistence(anyhow::Error),
}
