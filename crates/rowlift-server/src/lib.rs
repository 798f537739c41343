//! Rowlift Server Library
//!
//! Time-budgeted import engine for large tabular files.
//!
//! # Overview
//!
//! Rowlift converts each row of a submitted xlsx/csv file into a validated,
//! persisted record. Files can hold far more rows than one queue task may
//! process under the queue's hard timeout, so the engine checkpoints
//! progress, voluntarily stops at 80% of the task budget, and chains
//! continuation jobs carrying the next row range, while keeping per-record
//! counters exact and isolating row-level failures.
//!
//! - **import**: the budget/scheduler/pipeline/orchestrator core
//! - **modules**: pluggable per-import-type validate/persist contracts
//! - **sheet**: random-access tabular readers and the report writer
//! - **store**: narrow durable mutations over PostgreSQL (SQLx)
//! - **storage**: S3-compatible object storage for files and artifacts
//!
//! ## Framework Stack
//!
//! - **Apalis**: Postgres-backed job queue driving the cycles
//! - **SQLx**: record, failed-row, and attachment stores
//! - **Calamine / csv**: tabular file access
//!
//! # Example
//!
//! ```no_run
//! use rowlift_server::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     println!("budget: {}s", config.import.max_task_duration_secs);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod import;
pub mod models;
pub mod modules;
pub mod sheet;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use import::{ImportError, ImportOrchestrator, ImportSubmission};
