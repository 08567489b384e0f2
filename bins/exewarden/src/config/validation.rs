use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &ExewardenConfig) -> Result<()> {
    validate_server(&config.server)?;
    validate_executable(&config.executable)?;
    validate_log_store(&config.log_store)?;
    validate_stop(&config.stop)?;
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<()> {
    if server.port == 0 {
        return Err(anyhow!("Port must be between 1 and 65535, got: {}", server.port));
    }

    if server.host.trim().is_empty() {
        return Err(anyhow!("Server host cannot be empty"));
    }

    Ok(())
}

// The file itself is only checked at start time; it may appear later.
fn validate_executable(executable: &ExecutableConfig) -> Result<()> {
    if let Some(path) = &executable.path {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("Executable path cannot be empty; omit it to use the platform default"));
        }
    }

    if executable.environment.keys().any(|k| k.is_empty() || k.contains('=')) {
        return Err(anyhow!("Environment variable names cannot be empty or contain '='"));
    }

    Ok(())
}

fn validate_log_store(log_store: &LogStoreConfig) -> Result<()> {
    if log_store.file.as_os_str().is_empty() {
        return Err(anyhow!("Log file path cannot be empty"));
    }

    if log_store.tail_lines == 0 {
        return Err(anyhow!("Log tail_lines must be greater than 0"));
    }

    Ok(())
}

fn validate_stop(stop: &StopConfig) -> Result<()> {
    if stop.graceful_timeout.is_zero() {
        return Err(anyhow!("Graceful stop timeout must be greater than 0"));
    }

    if stop.force_kill_timeout.is_zero() {
        return Err(anyhow!("Force kill timeout must be greater than 0"));
    }

    Ok(())
}
