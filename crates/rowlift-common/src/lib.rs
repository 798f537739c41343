//! Rowlift Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the rowlift workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all rowlift workspace
//! members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing subscriber setup
//! - **Checksums**: File integrity verification utilities
//! - **Types**: Shared data structures
//!
//! # Example
//!
//! ```no_run
//! use rowlift_common::{Result, checksum};
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let digest = checksum::compute_file_checksum(path)?;
//!     println!("File sha256: {}", digest);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
