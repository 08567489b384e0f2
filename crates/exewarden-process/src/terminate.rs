//! Process termination primitives.
//!
//! Graceful termination is SIGTERM on Unix. Windows has no graceful signal
//! for a console-less child, so there both calls end in `TerminateProcess`.

use crate::{SignalError, SignalResult};
use tracing::{debug, warn};

/// Whether [`terminate_gracefully`] sends a catchable signal. When false,
/// graceful termination already ends the process the hard way.
pub const GRACEFUL_TERMINATION_SUPPORTED: bool = cfg!(unix);

/// Ask a process to terminate (SIGTERM on Unix).
pub fn terminate_gracefully(pid: u32) -> SignalResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        debug!("Sending SIGTERM to PID {}", pid);
        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| {
            warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
            SignalError::failed(pid, e.to_string())
        })
    }

    #[cfg(windows)]
    {
        debug!("No graceful signal on Windows, terminating PID {}", pid);
        force_kill(pid)
    }
}

/// Force kill a process (SIGKILL on Unix, TerminateProcess on Windows).
pub fn force_kill(pid: u32) -> SignalResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        debug!("Sending SIGKILL to PID {}", pid);
        kill(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(|e| {
            warn!("Failed to send SIGKILL to PID {}: {}", pid, e);
            SignalError::failed(pid, e.to_string())
        })
    }

    #[cfg(windows)]
    {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
                Ok(h) if !h.is_invalid() => h,
                _ => {
                    warn!("Failed to open PID {} for termination", pid);
                    return Err(SignalError::failed(
                        pid,
                        "Failed to open process for termination",
                    ));
                }
            };

            let result = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);

            result.map_err(|e| {
                warn!("TerminateProcess failed for PID {}: {}", pid, e);
                SignalError::failed(pid, format!("TerminateProcess failed: {}", e))
            })
        }
    }
}
