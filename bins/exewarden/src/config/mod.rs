use anyhow::{Context, Result};
use exewarden_supervisor::{ExecutionSpec, SupervisorOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod validation;

pub const DEFAULT_PORT: u16 = 5005;
pub const DEFAULT_LOG_FILE: &str = "exe_logs.txt";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExewardenConfig {
    pub server: ServerConfig,
    pub executable: ExecutableConfig,
    pub log_store: LogStoreConfig,
    pub stop: StopConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// The supervised executable and how it is launched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableConfig {
    /// Platform default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStoreConfig {
    pub file: PathBuf,
    /// Lines returned by a status query
    pub tail_lines: usize,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            tail_lines: exewarden_supervisor::DEFAULT_TAIL_LINES,
        }
    }
}

/// Escalation timings for stopping the child
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConfig {
    #[serde(with = "duration_serde")]
    pub graceful_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub force_kill_timeout: Duration,
    /// How long output is still collected after the child exits
    #[serde(with = "duration_serde")]
    pub exit_drain_grace: Duration,
}

impl Default for StopConfig {
    fn default() -> Self {
        let options = SupervisorOptions::default();
        Self {
            graceful_timeout: options.graceful_timeout,
            force_kill_timeout: options.force_kill_timeout,
            exit_drain_grace: options.exit_drain_grace,
        }
    }
}

impl ExewardenConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string. An empty document yields the defaults.
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ExewardenConfig = if content.trim().is_empty() {
            ExewardenConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Launch description; the executable path is left empty when unset so the
    /// locator falls back to the platform default.
    pub fn execution_spec(&self) -> ExecutionSpec {
        ExecutionSpec {
            executable: self.executable.path.clone().unwrap_or_default(),
            args: self.executable.args.clone(),
            working_directory: self.executable.working_directory.clone(),
            environment: self.executable.environment.clone(),
        }
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            graceful_timeout: self.stop.graceful_timeout,
            force_kill_timeout: self.stop.force_kill_timeout,
            exit_drain_grace: self.stop.exit_drain_grace,
            ..SupervisorOptions::default()
        }
    }
}

// Durations are written as "2s", "500ms" or "1m"
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" before "s", since "ms" ends with 's'
        if let Some(num) = s.strip_suffix("ms") {
            let millis: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num) = s.strip_suffix('s') {
            let secs: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num) = s.strip_suffix('m') {
            let mins: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
