//! StatusGateway: the thin facade the HTTP layer talks to.
//!
//! Translates supervisor results into status/message pairs. Nothing here
//! fails; every error ends up in a response body.

use crate::locator::ExecutableLocator;
use crate::types::{CommandResponse, StatusSnapshot};
use exewarden_common::SupervisorError;
use exewarden_log_store::DEFAULT_TAIL_LINES;
use exewarden_supervisor::ProcessSupervisor;
use tracing::{info, warn};

pub const MSG_STARTED: &str = "Program started.";
pub const MSG_STOPPED: &str = "Program stopped.";
pub const MSG_ALREADY_RUNNING: &str = "A program is already running.";
pub const MSG_ALREADY_STOPPED: &str = "already stopped";

#[derive(Debug, Clone)]
pub struct StatusGateway {
    supervisor: ProcessSupervisor,
    locator: ExecutableLocator,
    tail_lines: usize,
}

impl StatusGateway {
    pub fn new(supervisor: ProcessSupervisor, locator: ExecutableLocator) -> Self {
        Self {
            supervisor,
            locator,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Number of log lines returned by [`query`](Self::query).
    pub fn with_tail_lines(mut self, tail_lines: usize) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Current status. Never touches the child, so it stays responsive
    /// whatever the child is doing.
    pub fn query(&self) -> StatusSnapshot {
        let snapshot = self.supervisor.snapshot();

        let logs = match self.supervisor.log_store().tail(self.tail_lines) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Failed to read log store");
                vec![format!("Error reading logs: {}", e)]
            }
        };

        StatusSnapshot {
            is_running: snapshot.is_running(),
            logs,
            last_error: snapshot.last_error,
        }
    }

    pub async fn start(&self) -> CommandResponse {
        let spec = self.locator.locate();

        match self.supervisor.start(&spec).await {
            Ok(started) => {
                info!(run_id = %started.run_id, pid = started.pid, "Program started");
                CommandResponse::success(MSG_STARTED)
            }
            Err(SupervisorError::AlreadyRunning) => CommandResponse::error(MSG_ALREADY_RUNNING),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Start failed");
                CommandResponse::error(e.to_string())
            }
        }
    }

    pub async fn stop(&self) -> CommandResponse {
        match self.supervisor.stop().await {
            Ok(stopped) => {
                info!(run_id = %stopped.run_id, exit_code = ?stopped.exit_code, "Program stopped");
                CommandResponse::success(MSG_STOPPED)
            }
            Err(SupervisorError::NotRunning) => CommandResponse::error(MSG_ALREADY_STOPPED),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Stop failed");
                CommandResponse::error(e.to_string())
            }
        }
    }
}
