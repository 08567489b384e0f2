//! ProcessSupervisor: owns the single child process slot.
//!
//! All state shared between callers and the drain task (state, handle,
//! last error, outcome) sits in one [`SupervisedProcess`] behind one mutex.
//! The lock is never held across an `.await`.
//!
//! Lock order is slot -> log store. Terminal log lines are written while the
//! slot lock is held, so a new start (which truncates the log under the same
//! lock) can never interleave with the end of the previous run.

use crate::drain::{self, MergedOutput};
use crate::state::{ExitOutcome, ProcessState};
use chrono::{DateTime, Utc};
use exewarden_common::{RunId, SupervisorError, SupervisorResult};
use exewarden_log_store::LogStore;
use exewarden_process::{
    build_command, force_kill, terminate_gracefully, validate_executable, ExecutionSpec,
    GRACEFUL_TERMINATION_SUPPORTED, UNKNOWN_EXIT_CODE,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// `last_error` before anything has gone wrong.
pub const NO_ERROR_YET: &str = "No error recorded yet.";

pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RECENT_LINES: usize = 50;
pub const DEFAULT_CRASH_TAIL_LINES: usize = 15;
pub const DEFAULT_EXIT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Tunables for a [`ProcessSupervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// How long stop waits after the graceful termination request
    pub graceful_timeout: Duration,
    /// How long stop waits after a force kill
    pub force_kill_timeout: Duration,
    /// Size of the in-memory ring of recent output lines
    pub recent_lines: usize,
    /// How many ring lines go into a crash report
    pub crash_tail_lines: usize,
    /// How long output is still read after the child has exited
    pub exit_drain_grace: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
            force_kill_timeout: DEFAULT_FORCE_KILL_TIMEOUT,
            recent_lines: DEFAULT_RECENT_LINES,
            crash_tail_lines: DEFAULT_CRASH_TAIL_LINES,
            exit_drain_grace: DEFAULT_EXIT_DRAIN_GRACE,
        }
    }
}

/// Returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub run_id: RunId,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// Returned by a successful stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopped {
    pub run_id: RunId,
    /// `None` if the exit code could not be observed
    pub exit_code: Option<i32>,
    /// The child was killed without a chance to exit on its own
    pub forced: bool,
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorSnapshot {
    pub state: ProcessState,
    pub run_id: Option<RunId>,
    pub pid: Option<u32>,
    pub executable: Option<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set once the child has exited, while its leftover output is drained
    pub exit_code: Option<i32>,
    pub last_error: String,
    pub last_outcome: Option<ExitOutcome>,
}

impl SupervisorSnapshot {
    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running && self.exit_code.is_none()
    }
}

/// Handle to the active child. Discarded when the run ends.
struct ProcessHandle {
    run_id: RunId,
    pid: u32,
    executable: PathBuf,
    started_at: DateTime<Utc>,
    stop_requested: bool,
    exit_code: Option<i32>,
    drain: Option<JoinHandle<i32>>,
    // Held open so the child never sees EOF on stdin
    _stdin: Option<ChildStdin>,
}

/// The single child process slot.
struct SupervisedProcess {
    state: ProcessState,
    handle: Option<ProcessHandle>,
    last_error: String,
    outcome: Option<ExitOutcome>,
    next_run: RunId,
}

impl SupervisedProcess {
    fn new() -> Self {
        Self {
            state: ProcessState::Idle,
            handle: None,
            last_error: NO_ERROR_YET.to_string(),
            outcome: None,
            next_run: RunId::first(),
        }
    }

    fn current(&self, run_id: RunId) -> Option<&ProcessHandle> {
        self.handle.as_ref().filter(|h| h.run_id == run_id)
    }

    fn is_running(&self) -> bool {
        self.state == ProcessState::Running
            && self.handle.as_ref().map_or(false, |h| h.exit_code.is_none())
    }

    fn record_launch_failure(&mut self, err: &SupervisorError) {
        let reason = match err {
            SupervisorError::LaunchFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        self.outcome = Some(ExitOutcome::LaunchFailed { reason });
        self.last_error = err.to_string();
    }
}

/// State shared between the supervisor and its drain task.
pub(crate) struct Shared {
    slot: Mutex<SupervisedProcess>,
    pub(crate) log: LogStore,
    pub(crate) options: SupervisorOptions,
}

impl Shared {
    /// Record that the child of `run_id` has exited. The run stays in the
    /// slot until its output is drained and [`finish_run`](Self::finish_run)
    /// is called.
    pub(crate) fn mark_exited(&self, run_id: RunId, code: i32) {
        let mut slot = self.slot.lock();
        if let Some(handle) = slot.handle.as_mut().filter(|h| h.run_id == run_id) {
            debug!(%run_id, code, "Child exited, draining remaining output");
            handle.exit_code = Some(code);
        }
    }

    fn exit_code(&self, run_id: RunId) -> Option<i32> {
        self.slot.lock().current(run_id).and_then(|h| h.exit_code)
    }

    /// Terminal bookkeeping for a run: system log lines, outcome, back to idle.
    ///
    /// Only the run that currently owns the slot is finished; later calls for
    /// the same run are no-ops.
    pub(crate) fn finish_run(&self, run_id: RunId, code: i32, tail: Vec<String>) {
        let mut slot = self.slot.lock();

        let stop_requested = match slot.current(run_id) {
            Some(handle) => handle.stop_requested,
            None => {
                debug!(%run_id, "Run already finished, skipping terminal bookkeeping");
                return;
            }
        };

        self.append_system_line(&format!("[SYSTEM] Process exited with code: {}", code));

        let outcome = if stop_requested {
            self.append_system_line("[SYSTEM] Program stopped by user.");
            info!(%run_id, code, "Process stopped by user");
            ExitOutcome::StoppedByUser { code }
        } else if code == 0 {
            info!(%run_id, "Process exited cleanly");
            ExitOutcome::Clean
        } else {
            let report = SupervisorError::crashed(code, &tail);
            warn!(%run_id, code, "Process crashed");
            slot.last_error = report.to_string();
            ExitOutcome::Crashed { code, tail }
        };

        slot.outcome = Some(outcome);
        slot.state = ProcessState::Idle;
        slot.handle = None;
    }

    fn append_system_line(&self, line: &str) {
        if let Err(e) = self.log.append(line) {
            warn!(error = %e, "Failed to write system line to log store");
        }
    }
}

/// Supervises at most one child process at a time.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct ProcessSupervisor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("ProcessSupervisor")
            .field("state", &slot.state)
            .field("log", &self.shared.log.path())
            .field("options", &self.shared.options)
            .finish()
    }
}

impl ProcessSupervisor {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self::with_options(log_file, SupervisorOptions::default())
    }

    pub fn with_options(log_file: impl Into<PathBuf>, options: SupervisorOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(SupervisedProcess::new()),
                log: LogStore::new(log_file),
                options,
            }),
        }
    }

    /// Start the child described by `spec`.
    ///
    /// Truncates the log store, writes the start banner, spawns the child and
    /// one drain task bound to it. Must be called within a tokio runtime.
    pub async fn start(&self, spec: &ExecutionSpec) -> SupervisorResult<Started> {
        let executable = spec.executable().to_path_buf();
        let mut slot = self.shared.slot.lock();

        if !slot.state.can_start() {
            debug!(state = %slot.state, "Start rejected, process slot busy");
            return Err(SupervisorError::AlreadyRunning);
        }

        validate_executable(&executable)?;

        let banner = format!("Starting executable: {}...", executable.display());
        if let Err(e) = self.shared.log.reset(&banner) {
            let err = SupervisorError::launch_failed(&executable, e.to_string());
            error!(error = %e, "Failed to prepare log store");
            slot.record_launch_failure(&err);
            return Err(err);
        }

        info!(executable = %executable.display(), args = ?spec.args, "Spawning process");

        let mut child = match build_command(spec).spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = SupervisorError::launch_failed(&executable, e.to_string());
                error!(executable = %executable.display(), error = %e, "Failed to spawn process");
                slot.record_launch_failure(&err);
                self.shared.append_system_line(&format!("[SYSTEM] {}", err));
                return Err(err);
            }
        };

        let pid = match running_pid(&mut child, &executable) {
            Ok(pid) => pid,
            Err(err) => {
                error!(executable = %executable.display(), "Spawned process has no PID");
                slot.record_launch_failure(&err);
                self.shared.append_system_line(&format!("[SYSTEM] {}", err));
                return Err(err);
            }
        };
        let run_id = slot.next_run;
        slot.next_run = run_id.next();

        let output = MergedOutput::new(child.stdout.take(), child.stderr.take());
        let stdin = child.stdin.take();
        let drain = tokio::spawn(drain::run(Arc::clone(&self.shared), run_id, pid, child, output));

        let started_at = Utc::now();
        slot.state = ProcessState::Running;
        slot.handle = Some(ProcessHandle {
            run_id,
            pid,
            executable,
            started_at,
            stop_requested: false,
            exit_code: None,
            drain: Some(drain),
            _stdin: stdin,
        });

        info!(%run_id, pid, "Process spawned successfully");
        Ok(Started {
            run_id,
            pid,
            started_at,
        })
    }

    /// Stop the running child.
    ///
    /// Sends a graceful termination request, waits up to the graceful
    /// timeout, then force-kills. Returns once the slot is idle again.
    ///
    /// A child that has already exited is not running: its run ends with its
    /// own outcome and stop returns `NotRunning`.
    pub async fn stop(&self) -> SupervisorResult<Stopped> {
        let (run_id, pid, drain) = {
            let mut slot = self.shared.slot.lock();
            if !slot.state.can_stop() {
                return Err(SupervisorError::NotRunning);
            }
            let handle = match slot.handle.as_mut() {
                Some(handle) if handle.exit_code.is_none() => handle,
                _ => return Err(SupervisorError::NotRunning),
            };
            handle.stop_requested = true;
            let taken = (handle.run_id, handle.pid, handle.drain.take());
            slot.state = ProcessState::Stopping;
            taken
        };

        info!(%run_id, pid, "Stopping process");

        // Without a catchable signal the graceful request is already a kill
        let forced = match terminate_gracefully(pid) {
            Ok(()) => !GRACEFUL_TERMINATION_SUPPORTED,
            Err(e) => {
                warn!(%run_id, pid, error = %e, "Failed to send termination request");
                false
            }
        };

        let (exit_code, forced) = match drain {
            Some(mut task) => self.wait_for_exit(run_id, pid, &mut task, forced).await,
            None => {
                warn!(%run_id, "No drain task to wait for");
                (None, false)
            }
        };

        // No-op unless the drain task never got to finish the run itself
        self.shared
            .finish_run(run_id, exit_code.unwrap_or(UNKNOWN_EXIT_CODE), Vec::new());

        info!(%run_id, ?exit_code, forced, "Process stopped");
        Ok(Stopped {
            run_id,
            exit_code,
            forced,
        })
    }

    /// Wait for the drain task (which owns the child) to conclude, escalating
    /// to a force kill after the graceful timeout.
    ///
    /// Returns the exit code and whether the child was killed outright.
    async fn wait_for_exit(
        &self,
        run_id: RunId,
        pid: u32,
        task: &mut JoinHandle<i32>,
        mut forced: bool,
    ) -> (Option<i32>, bool) {
        let options = &self.shared.options;

        if let Some(code) = join_within(task, options.graceful_timeout).await {
            return (code, forced);
        }

        match self.shared.exit_code(run_id) {
            Some(code) => debug!(
                %run_id, pid, code,
                "Process already exited, waiting for its output to close"
            ),
            None => {
                warn!(
                    %run_id, pid,
                    "Graceful shutdown timed out after {:?}, attempting force kill",
                    options.graceful_timeout
                );
                match force_kill(pid) {
                    Ok(()) => forced = true,
                    Err(e) => error!(%run_id, pid, error = %e, "Force kill failed"),
                }
            }
        }

        if let Some(code) = join_within(task, options.force_kill_timeout).await {
            return (code, forced);
        }

        // The child is gone but something (an orphaned grandchild) still
        // holds its output pipe open. Give up on draining.
        error!(
            %run_id, pid,
            "Drain task still running {:?} after escalation, aborting it",
            options.force_kill_timeout
        );
        task.abort();
        (self.shared.exit_code(run_id), forced)
    }

    /// Stop the child if one is running. Used when the host shuts down.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(stopped) => info!(run_id = %stopped.run_id, "Stopped child during shutdown"),
            Err(SupervisorError::NotRunning) => debug!("No child to stop during shutdown"),
            Err(e) => warn!(error = %e, "Failed to stop child during shutdown"),
        }
    }

    /// `true` while a child is running: not once it has exited or is stopping.
    pub fn is_running(&self) -> bool {
        self.shared.slot.lock().is_running()
    }

    pub fn state(&self) -> ProcessState {
        self.shared.slot.lock().state
    }

    pub fn last_error(&self) -> String {
        self.shared.slot.lock().last_error.clone()
    }

    pub fn last_outcome(&self) -> Option<ExitOutcome> {
        self.shared.slot.lock().outcome.clone()
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        let slot = self.shared.slot.lock();
        let handle = slot.handle.as_ref();
        SupervisorSnapshot {
            state: slot.state,
            run_id: handle.map(|h| h.run_id),
            pid: handle.map(|h| h.pid),
            executable: handle.map(|h| h.executable.clone()),
            started_at: handle.map(|h| h.started_at),
            exit_code: handle.and_then(|h| h.exit_code),
            last_error: slot.last_error.clone(),
            last_outcome: slot.outcome.clone(),
        }
    }

    pub fn log_store(&self) -> &LogStore {
        &self.shared.log
    }
}

/// Await the task for at most `limit`.
///
/// `None` if it is still running; `Some(None)` if it ended without a code
/// (it panicked or was cancelled).
async fn join_within(task: &mut JoinHandle<i32>, limit: Duration) -> Option<Option<i32>> {
    match timeout(limit, task).await {
        Ok(Ok(code)) => Some(Some(code)),
        Ok(Err(e)) => {
            error!(error = %e, "Drain task ended abnormally");
            Some(None)
        }
        Err(_) => None,
    }
}

/// PID of a freshly spawned child. A child without one has already been
/// reaped; signalling PID 0 would hit the whole process group instead.
fn running_pid(child: &mut Child, executable: &Path) -> SupervisorResult<u32> {
    match child.id() {
        Some(pid) => Ok(pid),
        None => {
            let _ = child.start_kill();
            Err(SupervisorError::launch_failed(
                executable,
                "process exited before its PID could be read",
            ))
        }
    }
}
