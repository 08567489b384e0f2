//! Where the supervised executable lives.

use exewarden_supervisor::ExecutionSpec;
use std::path::PathBuf;
use tracing::debug;

/// Used on Unix-like hosts when no executable is configured.
pub const DEFAULT_UNIX_EXECUTABLE: &str = "/app/service";

/// Used on Windows when no executable is configured; resolved against the
/// parent of the directory holding the supervisor binary.
pub const DEFAULT_WINDOWS_EXECUTABLE: &str = "service.exe";

/// Resolves the launch description handed to the supervisor on each start.
///
/// The configured path wins; without one the platform default is used.
/// Arguments, working directory and environment are carried unchanged.
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    template: ExecutionSpec,
}

impl ExecutableLocator {
    /// `template.executable` may be empty, meaning "use the platform default".
    pub fn new(template: ExecutionSpec) -> Self {
        Self { template }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(ExecutionSpec::new(path))
    }

    pub fn platform_default() -> Self {
        Self::new(ExecutionSpec::default())
    }

    pub fn has_configured_path(&self) -> bool {
        !self.template.executable.as_os_str().is_empty()
    }

    /// What to launch, with the executable path filled in.
    pub fn locate(&self) -> ExecutionSpec {
        let mut spec = self.template.clone();
        if !self.has_configured_path() {
            spec.executable = default_executable();
            debug!(path = %spec.executable.display(), "Using platform default executable");
        }
        spec
    }
}

#[cfg(unix)]
fn default_executable() -> PathBuf {
    PathBuf::from(DEFAULT_UNIX_EXECUTABLE)
}

#[cfg(windows)]
fn default_executable() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(|dir| dir.parent()).map(|p| p.to_path_buf()))
        .map(|base| base.join(DEFAULT_WINDOWS_EXECUTABLE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WINDOWS_EXECUTABLE))
}
