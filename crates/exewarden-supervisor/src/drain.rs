//! Background drain task: one per running child.
//!
//! Reads stdout and stderr as one merged line stream and persists every line.
//! The child's exit is observed alongside the output, so a dead child is
//! recorded as exited even while a descendant still holds its pipes open.
//! Output left after the exit gets a short grace period before the run is
//! handed to the supervisor for classification.

use crate::supervisor::Shared;
use exewarden_common::RunId;
use exewarden_log_store::RecentLines;
use exewarden_process::{exit_code, UNKNOWN_EXIT_CODE};
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Line reader over one output stream.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`. Partially read bytes stay in
/// `buf` across calls, so `next_line` can be raced in `select!` without
/// losing data.
struct StreamLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    // Last line ended in '\r'; a '\n' opening the next read belongs to it
    skip_lf: bool,
}

impl<R: AsyncRead + Unpin> StreamLines<R> {
    fn new(stream: R) -> Self {
        Self {
            reader: BufReader::new(stream),
            buf: Vec::new(),
            skip_lf: false,
        }
    }

    /// Next line without its terminator, or `None` at end of stream.
    /// A final fragment with no terminator still counts as a line.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let mut start = 0;
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    start = 1;
                }
            }

            match available[start..].iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(offset) => {
                    let end = start + offset;
                    self.buf.extend_from_slice(&available[start..end]);

                    let mut used = end + 1;
                    if available[end] == b'\r' {
                        match available.get(used) {
                            Some(b'\n') => used += 1,
                            Some(_) => {}
                            None => self.skip_lf = true,
                        }
                    }

                    self.reader.consume(used);
                    return Ok(Some(self.take_line()));
                }
                None => {
                    self.buf.extend_from_slice(&available[start..]);
                    let used = available.len();
                    self.reader.consume(used);
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

async fn read_from<R: AsyncRead + Unpin>(stream: &mut Option<StreamLines<R>>) -> io::Result<Option<String>> {
    match stream {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// stdout and stderr merged in arrival order.
///
/// Each stream keeps its own line order; which of two near-simultaneous
/// lines from different streams comes first is whatever the OS delivers.
pub(crate) struct MergedOutput {
    stdout: Option<StreamLines<ChildStdout>>,
    stderr: Option<StreamLines<ChildStderr>>,
}

impl MergedOutput {
    pub(crate) fn new(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> Self {
        Self {
            stdout: stdout.map(StreamLines::new),
            stderr: stderr.map(StreamLines::new),
        }
    }

    /// Next line from either stream; `None` once both are closed.
    pub(crate) async fn next_line(&mut self) -> Option<String> {
        loop {
            let stdout_open = self.stdout.is_some();
            let stderr_open = self.stderr.is_some();
            if !stdout_open && !stderr_open {
                return None;
            }

            tokio::select! {
                result = read_from(&mut self.stdout), if stdout_open => {
                    match result {
                        Ok(Some(line)) => return Some(line),
                        Ok(None) => self.stdout = None,
                        Err(e) => {
                            warn!(error = %e, "Error reading child stdout, closing stream");
                            self.stdout = None;
                        }
                    }
                }
                result = read_from(&mut self.stderr), if stderr_open => {
                    match result {
                        Ok(Some(line)) => return Some(line),
                        Ok(None) => self.stderr = None,
                        Err(e) => {
                            warn!(error = %e, "Error reading child stderr, closing stream");
                            self.stderr = None;
                        }
                    }
                }
            }
        }
    }
}

/// Body of the drain task. Returns the child's exit code.
pub(crate) async fn run(
    shared: Arc<Shared>,
    run_id: RunId,
    pid: u32,
    mut child: Child,
    mut output: MergedOutput,
) -> i32 {
    debug!(%run_id, pid, "Drain task started");

    let mut recent = RecentLines::new(shared.options.recent_lines);

    let exited = loop {
        tokio::select! {
            line = output.next_line() => match line {
                Some(line) => persist(&shared, run_id, &mut recent, line),
                None => break None,
            },
            status = child.wait() => break Some(status),
        }
    };

    let code = match exited {
        Some(status) => {
            let code = code_from(run_id, pid, status);
            shared.mark_exited(run_id, code);

            let grace = shared.options.exit_drain_grace;
            let remaining = async {
                while let Some(line) = output.next_line().await {
                    persist(&shared, run_id, &mut recent, line);
                }
            };
            if timeout(grace, remaining).await.is_err() {
                warn!(
                    %run_id, pid,
                    "Output still open {:?} after exit, likely held by a descendant; dropping it",
                    grace
                );
            }
            code
        }
        None => {
            debug!(%run_id, pid, "Output stream ended");
            drop(output);
            code_from(run_id, pid, child.wait().await)
        }
    };

    shared.finish_run(run_id, code, recent.last(shared.options.crash_tail_lines));
    debug!(%run_id, pid, code, "Drain task completed");
    code
}

fn persist(shared: &Shared, run_id: RunId, recent: &mut RecentLines, line: String) {
    if let Err(e) = shared.log.append(&line) {
        warn!(%run_id, error = %e, "Failed to persist output line");
    }
    recent.push(line);
}

fn code_from(run_id: RunId, pid: u32, status: io::Result<ExitStatus>) -> i32 {
    match status {
        Ok(status) => exit_code(&status),
        Err(e) => {
            error!(%run_id, pid, error = %e, "Failed to wait for child exit");
            UNKNOWN_EXIT_CODE
        }
    }
}
