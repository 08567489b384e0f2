//! # exewarden log store
//!
//! Output persistence for the supervised process.
//!
//! This crate provides:
//! - [`LogStore`]: an append-only text file, truncated per run, read back as a
//!   tail window of the most recent lines
//! - [`RecentLines`]: a bounded in-memory ring of the latest output lines,
//!   used to build crash reports

pub mod recent;
pub mod store;

use exewarden_common::SupervisorError;
use std::path::PathBuf;
use thiserror::Error;

/// Log store failures.
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("Failed to {operation} log file {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogStoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<LogStoreError> for SupervisorError {
    fn from(e: LogStoreError) -> Self {
        SupervisorError::log_io(e.to_string())
    }
}

/// Result type for log store operations.
pub type LogStoreResult<T> = std::result::Result<T, LogStoreError>;

// Re-export main types
pub use recent::RecentLines;
pub use store::{LogStore, DEFAULT_TAIL_LINES};
