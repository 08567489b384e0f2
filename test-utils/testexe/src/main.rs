use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::time::sleep;

/// Test executable for exewarden supervisor testing
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Scriptable child process for supervisor testing", long_about = None)]
struct Args {
    /// Lines to print on stdout
    #[arg(long, default_value = "10")]
    lines: u32,

    /// Lines to print on stderr, interleaved with stdout
    #[arg(long, default_value = "0")]
    stderr_lines: u32,

    /// Delay between lines in milliseconds
    #[arg(long, default_value = "0")]
    interval_ms: u64,

    /// Exit code once all lines are printed
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Keep running after printing until terminated
    #[arg(long)]
    run_forever: bool,

    /// Ignore graceful termination requests (forces the supervisor to kill)
    #[arg(long)]
    ignore_sigterm: bool,

    /// Omit the line terminator on the final stdout line
    #[arg(long)]
    no_trailing_newline: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    #[cfg(unix)]
    {
        if args.ignore_sigterm {
            use tokio::signal::unix::{signal, SignalKind};

            // Registered before any output, so "ready" implies SIGTERM is ignored
            match signal(SignalKind::terminate()) {
                Ok(sigterm) => {
                    tokio::spawn(swallow_sigterm(sigterm));
                }
                Err(e) => eprintln!("testexe: failed to install SIGTERM handler: {}", e),
            }
        }
    }

    let total = args.lines.max(args.stderr_lines);
    for i in 1..=total {
        if i <= args.lines {
            let last = i == args.lines;
            if last && args.no_trailing_newline {
                print!("line {}", i);
            } else {
                println!("line {}", i);
            }
            let _ = std::io::stdout().flush();
        }
        if i <= args.stderr_lines {
            eprintln!("error line {}", i);
        }
        if args.interval_ms > 0 {
            sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    if args.run_forever {
        println!("ready");
        let _ = std::io::stdout().flush();
        loop {
            sleep(Duration::from_secs(3600)).await;
        }
    }

    std::process::exit(args.exit_code);
}

/// Installing a tokio handler replaces the default SIGTERM action; the
/// signals are then just counted and ignored.
#[cfg(unix)]
async fn swallow_sigterm(mut sigterm: tokio::signal::unix::Signal) {
    let mut received = 0u32;
    while sigterm.recv().await.is_some() {
        received += 1;
        eprintln!("testexe: ignoring SIGTERM ({})", received);
    }
}
