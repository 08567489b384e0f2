//! Process execution primitives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Exit code reported when the OS gives neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// What to run: the executable plus the options it is launched with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Added on top of the supervisor's own environment.
    pub environment: HashMap<String, String>,
}

impl ExecutionSpec {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

/// Build the child command.
///
/// Both output streams are piped so the caller can drain them as one merged
/// line stream. Stdin is piped and left open; the supervisor never writes it.
pub fn build_command(spec: &ExecutionSpec) -> Command {
    let mut cmd = Command::new(&spec.executable);
    cmd.args(&spec.args);

    if let Some(ref wd) = spec.working_directory {
        cmd.current_dir(wd);
    }

    for (key, value) in &spec.environment {
        cmd.env(key, value);
    }

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::piped());

    // No console window for the child
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd
}

/// Exit code of a finished process.
///
/// A Unix process killed by a signal has no exit code; it is reported as the
/// negated signal number (SIGTERM -> -15).
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    UNKNOWN_EXIT_CODE
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_command_applies_args_and_env() {
        let spec = ExecutionSpec::new("/bin/sh")
            .with_args(["-c", "echo \"$GREETING $0\""])
            .with_env("GREETING", "hello");
        let output = build_command(&spec).output().await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello /bin/sh\n");
    }

    #[tokio::test]
    async fn test_build_command_applies_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ExecutionSpec::new("/bin/sh")
            .with_args(["-c", "pwd"])
            .with_working_directory(dir.path());
        let output = build_command(&spec).output().await.unwrap();
        let printed = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(&printed).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_exit_code_plain() {
        let status = Command::new("/bin/sh")
            .args(["-c", "exit 7"])
            .status()
            .await
            .unwrap();
        assert_eq!(exit_code(&status), 7);
    }

    #[tokio::test]
    async fn test_exit_code_from_signal_is_negated() {
        let status = Command::new("/bin/sh")
            .args(["-c", "kill -TERM $$"])
            .status()
            .await
            .unwrap();
        assert_eq!(exit_code(&status), -15);
    }
}
