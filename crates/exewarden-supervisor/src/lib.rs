//! # exewarden supervisor
//!
//! Lifecycle of one supervised external executable.
//!
//! This crate provides:
//! - [`ProcessSupervisor`]: start, stop and inspect the single child slot
//! - Output draining into the log store and the recent-lines ring
//! - Exit classification ([`ExitOutcome`]) and crash reports
//!
//! At most one child exists at any time. A run ends when its drain task has
//! collected the exit code and drained the output, or given up on output a
//! descendant keeps open.

mod drain;
pub mod state;
pub mod supervisor;


// Re-export main types
pub use exewarden_log_store::DEFAULT_TAIL_LINES;
pub use exewarden_process::ExecutionSpec;
pub use state::{ExitOutcome, ProcessState};
pub use supervisor::{
    ProcessSupervisor, Started, Stopped, SupervisorOptions, SupervisorSnapshot, NO_ERROR_YET,
};
