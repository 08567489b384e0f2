//! exewarden wrapper for E2E testing

use crate::http::ApiClient;
use hyper::Method;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Knobs for the generated config file
#[derive(Debug, Clone)]
pub struct TestConfigOptions {
    pub testexe_args: Vec<String>,
    pub graceful_timeout_ms: u64,
    pub force_kill_timeout_ms: u64,
}

impl Default for TestConfigOptions {
    fn default() -> Self {
        Self {
            testexe_args: vec!["--run-forever".to_string()],
            graceful_timeout_ms: 2000,
            force_kill_timeout_ms: 3000,
        }
    }
}

/// A running exewarden server supervising testexe
pub struct ExewardenWrapper {
    process: Option<Child>,
    api: ApiClient,
    pub port: u16,
    pub test_dir: PathBuf,
}

impl ExewardenWrapper {
    /// Write the config, spawn exewarden and wait until its API answers
    pub fn start(
        exewarden_path: &Path,
        testexe_path: &Path,
        test_dir: &Path,
        options: TestConfigOptions,
    ) -> Result<Self, String> {
        let port = crate::free_port();
        let config_path = test_dir.join("exewarden.yaml");
        let args: Vec<String> = options
            .testexe_args
            .iter()
            .map(|a| format!("'{}'", a))
            .collect();

        let yaml = format!(
            "server:\n  host: 127.0.0.1\n  port: {port}\n\
             executable:\n  path: '{exe}'\n  args: [{args}]\n\
             log_store:\n  file: '{log}'\n\
             stop:\n  graceful_timeout: {graceful}ms\n  force_kill_timeout: {force}ms\n",
            port = port,
            exe = testexe_path.display(),
            args = args.join(", "),
            log = test_dir.join("exe_logs.txt").display(),
            graceful = options.graceful_timeout_ms,
            force = options.force_kill_timeout_ms,
        );
        fs::write(&config_path, yaml).map_err(|e| format!("Failed to write config: {}", e))?;

        let output = fs::File::create(test_dir.join("exewarden.out"))
            .map_err(|e| format!("Failed to create output file: {}", e))?;
        let output_err = output
            .try_clone()
            .map_err(|e| format!("Failed to clone output file: {}", e))?;

        println!("Starting exewarden: {}", exewarden_path.display());
        let child = Command::new(exewarden_path)
            .arg("--config")
            .arg(&config_path)
            .current_dir(test_dir)
            .env_remove("PORT")
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(output_err))
            .spawn()
            .map_err(|e| format!("Failed to spawn exewarden: {}", e))?;

        let mut wrapper = Self {
            process: Some(child),
            api: ApiClient::new(port)?,
            port,
            test_dir: test_dir.to_path_buf(),
        };
        wrapper.wait_for_ready(Duration::from_secs(10))?;
        Ok(wrapper)
    }

    fn wait_for_ready(&mut self, timeout: Duration) -> Result<(), String> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok((200, body)) = self.api.request(Method::GET, "/api/health") {
                if body == "OK" {
                    return Ok(());
                }
            }
            thread::sleep(Duration::from_millis(100));
        }
        Err(format!("exewarden did not become ready within {:?}", timeout))
    }

    pub fn status(&self) -> Result<Value, String> {
        self.api.request_json(Method::GET, "/api/status")
    }

    pub fn start_program(&self) -> Result<Value, String> {
        self.api.request_json(Method::POST, "/api/start")
    }

    pub fn stop_program(&self) -> Result<Value, String> {
        self.api.request_json(Method::POST, "/api/stop")
    }

    /// Poll the status endpoint until `predicate` holds
    pub fn wait_for_status(
        &self,
        predicate: impl Fn(&Value) -> bool,
        timeout: Duration,
    ) -> Result<Value, String> {
        let start = Instant::now();
        loop {
            let status = self.status()?;
            if predicate(&status) {
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                return Err(format!("Status condition not met within {:?}: {}", timeout, status));
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    /// Log lines from a status snapshot
    pub fn logs(status: &Value) -> Vec<String> {
        status["logs"]
            .as_array()
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a termination signal and wait for exewarden to exit
    pub fn shutdown(&mut self) -> Result<(), String> {
        let Some(mut child) = self.process.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(child.id() as i32),
                nix::sys::signal::Signal::SIGTERM,
            )
            .map_err(|e| format!("Failed to send SIGTERM: {}", e))?;
        }

        #[cfg(windows)]
        {
            child.kill().map_err(|e| format!("Failed to kill exewarden: {}", e))?;
        }

        match child.wait_timeout(Duration::from_secs(10)) {
            Ok(Some(status)) => {
                println!("exewarden exited with status: {}", status);
                Ok(())
            }
            Ok(None) => {
                child.kill().ok();
                child.wait().ok();
                Err("exewarden did not exit in time".to_string())
            }
            Err(e) => Err(format!("Failed to wait for exewarden: {}", e)),
        }
    }
}

impl Drop for ExewardenWrapper {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            child.kill().ok();
            child.wait().ok();
        }
    }
}
