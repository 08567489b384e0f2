//! # exewarden process
//!
//! Low-level process operations used by the supervisor:
//! - Building the child command with merged-output piping
//! - Translating exit statuses into exit codes
//! - Graceful termination and force kill by PID
//! - Executable validation

pub mod execute;
pub mod terminate;
pub mod validation;

use thiserror::Error;

/// Failure to deliver a signal (or its platform equivalent) to a process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("Failed to signal process {pid}: {reason}")]
    Failed { pid: u32, reason: String },
}

impl SignalError {
    pub fn failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::Failed {
            pid,
            reason: reason.into(),
        }
    }
}

/// Result type for signal operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;

// Re-export main types
pub use execute::*;
pub use terminate::*;
pub use validation::*;
