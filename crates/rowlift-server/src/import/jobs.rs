//! Queue payloads and the enqueue contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sheet::RowRange;

/// Errors raised while enqueuing jobs
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to enqueue job: {0}")]
    Enqueue(String),
}

/// One import cycle over a record's assigned row range.
///
/// The first cycle carries no range and scans the whole file; continuations
/// carry the inclusive `[start_row, end_row]` slice negotiated by the
/// scheduler. This payload is the entire resumable cursor state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowsJob {
    pub record_id: i64,
    pub type_id: i16,
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
}

impl ImportRowsJob {
    /// Job for the first cycle: whole file, no range.
    pub fn first_cycle(record_id: i64, type_id: i16) -> Self {
        Self {
            record_id,
            type_id,
            start_row: None,
            end_row: None,
        }
    }

    /// Continuation of this job over the next range.
    pub fn continuation(&self, next: RowRange) -> Self {
        Self {
            record_id: self.record_id,
            type_id: self.type_id,
            start_row: Some(next.start),
            end_row: Some(next.end),
        }
    }

    /// The assigned range, present on continuation cycles only.
    pub fn row_range(&self) -> Option<RowRange> {
        match (self.start_row, self.end_row) {
            (Some(start), Some(end)) => Some(RowRange::new(start, end)),
            _ => None,
        }
    }

    pub fn is_first_cycle(&self) -> bool {
        self.row_range().is_none()
    }
}

/// Failure report generation for a completed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRowsReportJob {
    pub record_id: i64,
}

/// Enqueue contract consumed by the orchestrator and submission service.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_import(&self, job: ImportRowsJob) -> Result<(), QueueError>;

    async fn enqueue_report(&self, job: FailedRowsReportJob) -> Result<(), QueueError>;
}
