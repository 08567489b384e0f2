//! Process slot state and exit classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the single supervised process slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// No child process
    Idle,
    /// Child spawned and its output is being drained
    Running,
    /// Stop requested; waiting for the child and its drain task to finish
    Stopping,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Idle => write!(f, "idle"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopping => write!(f, "stopping"),
        }
    }
}

impl ProcessState {
    /// A child process (and its drain task) exists.
    pub fn is_active(&self) -> bool {
        !matches!(self, ProcessState::Idle)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, ProcessState::Idle)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

/// How the previous run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Exit code 0
    Clean,
    /// Non-zero exit code, with the last captured output lines
    Crashed { code: i32, tail: Vec<String> },
    /// Ended by an explicit stop
    StoppedByUser { code: i32 },
    /// The process could not be created
    LaunchFailed { reason: String },
}

impl ExitOutcome {
    /// Exit code of the run, when the child actually ran.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Clean => Some(0),
            ExitOutcome::Crashed { code, .. } | ExitOutcome::StoppedByUser { code } => Some(*code),
            ExitOutcome::LaunchFailed { .. } => None,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Clean => write!(f, "clean"),
            ExitOutcome::Crashed { code, .. } => write!(f, "crashed (code {})", code),
            ExitOutcome::StoppedByUser { .. } => write!(f, "stopped by user"),
            ExitOutcome::LaunchFailed { reason } => write!(f, "launch failed: {}", reason),
        }
    }
}
