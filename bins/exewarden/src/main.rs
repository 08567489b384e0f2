use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use exewarden_gateway::{ExecutableLocator, GatewayServer, StatusGateway};
use exewarden_supervisor::ProcessSupervisor;

mod config;

use config::ExewardenConfig;

/// exewarden - supervise one external executable over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Executable to supervise (overrides config)
    #[arg(short, long, value_name = "PATH")]
    executable: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn load_config(&self) -> Result<ExewardenConfig> {
        let mut config = match &self.config {
            Some(path) => ExewardenConfig::load_from_file(path)?,
            None => ExewardenConfig::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(executable) = &self.executable {
            config.executable.path = Some(executable.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    info!("Starting exewarden");
    if let Some(path) = &args.config {
        info!("Config file: {}", path.display());
    }

    let config = args.load_config()?;

    let supervisor =
        ProcessSupervisor::with_options(&config.log_store.file, config.supervisor_options());
    let locator = ExecutableLocator::new(config.execution_spec());
    info!(
        executable = %locator.locate().executable.display(),
        log_file = %config.log_store.file.display(),
        "Supervisor ready"
    );

    let gateway = StatusGateway::new(supervisor.clone(), locator)
        .with_tail_lines(config.log_store.tail_lines);

    let server = GatewayServer::bind(gateway, &config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    server
        .run_until(setup_signal_handlers())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down supervisor...");
    supervisor.shutdown().await;
    info!("exewarden shut down successfully");

    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

async fn setup_signal_handlers() {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{signal as unix_signal, SignalKind};

        match (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT signal");
                    }
                }
            }
            _ => {
                tracing::warn!("Failed to install SIGTERM/SIGINT handlers, falling back to Ctrl+C");
                let _ = signal::ctrl_c().await;
                info!("Received Ctrl+C signal");
            }
        }
    }

    #[cfg(windows)]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
