//! Error types for the supervisor.
//!
//! Every failure the supervisor can report is a variant of
//! [`SupervisorError`]. None of them is fatal to the supervisor itself: the
//! gateway turns each one into a status/message pair for the caller.
//!
//! ```rust
//! use exewarden_common::{SupervisorError, SupervisorResult};
//!
//! fn stop_idle() -> SupervisorResult<()> {
//!     Err(SupervisorError::NotRunning)
//! }
//!
//! assert!(matches!(stop_idle(), Err(SupervisorError::NotRunning)));
//! ```

use std::path::Path;
use thiserror::Error;

/// Result type alias for supervisor operations.
pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;

/// Failures reported by the process supervisor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// A child is already running (or still stopping).
    #[error("A program is already running")]
    AlreadyRunning,

    /// Stop was requested but no child is running.
    #[error("Program is not running")]
    NotRunning,

    /// The executable path does not resolve to an existing file.
    #[error("File not found: {path}")]
    ExecutableNotFound { path: String },

    /// The OS refused to create the child process.
    #[error("Launch error: {reason}")]
    LaunchFailed { path: String, reason: String },

    /// The child exited with a non-zero code.
    #[error("Crash detected (code {code}). Last lines:\n{tail}")]
    Crashed { code: i32, tail: String },

    /// Reading or writing the log store failed.
    #[error("Log I/O error: {reason}")]
    LogIo { reason: String },
}

impl SupervisorError {
    pub fn executable_not_found(path: impl AsRef<Path>) -> Self {
        Self::ExecutableNotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn launch_failed(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a crash report from the exit code and the captured tail lines.
    pub fn crashed<S: AsRef<str>>(code: i32, tail: &[S]) -> Self {
        let tail = tail
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::Crashed { code, tail }
    }

    pub fn log_io(reason: impl Into<String>) -> Self {
        Self::LogIo {
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the variant, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::ExecutableNotFound { .. } => "executable_not_found",
            Self::LaunchFailed { .. } => "launch_failed",
            Self::Crashed { .. } => "crashed",
            Self::LogIo { .. } => "log_io",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    fn from(e: std::io::Error) -> Self {
        Self::log_io(e.to_string())
    }
}
