//! Executable validation.

use exewarden_common::{SupervisorError, SupervisorResult};
use std::path::Path;

/// Validate that an executable path points at an existing file.
///
/// Only existence is checked here; whether the file can actually be executed
/// is left to the spawn, which reports it as a launch failure.
pub fn validate_executable(path: &Path) -> SupervisorResult<()> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(SupervisorError::executable_not_found(path));
    }

    Ok(())
}
