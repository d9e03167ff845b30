//! Serial Device Mock
//!
//! Emulates a serial device from a JSON rule file, over either a serial
//! port or a TCP listener (`socket://host:port`). Runs until interrupted.

mod cli;
mod logging;

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serdev_detect::VPortToolChecker;
use serdev_sim::Emulator;
use tokio::task;
use tracing::{info, warn};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;

    println!(
        "Starting {} emulator on {}",
        cli.protocol.name(),
        config.target
    );
    println!("Config file: {}", cli.config.display());
    if config.echo_mode() {
        println!("Echo mode: enabled");
    }
    println!("Press Ctrl+C to stop");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    if !config.target.is_listener() {
        tokio::select! {
            _ = report_vport_tool() => {}
            _ = &mut shutdown => {
                println!("\nStopping emulator...");
                return Ok(());
            }
        }
    }

    let emulator = Arc::new(Emulator::new(config));
    emulator
        .start()
        .with_context(|| format!("failed to start emulator on {}", emulator.config().target))?;

    let mut runner = {
        let emulator = Arc::clone(&emulator);
        task::spawn_blocking(move || emulator.run())
    };

    tokio::select! {
        result = &mut runner => {
            result.context("emulator thread panicked")??;
        }
        _ = &mut shutdown => {
            println!("\nStopping emulator...");
            emulator.stop();
            // A peer error racing the stop is irrelevant once we are exiting
            let _ = runner.await;
        }
    }

    info!("Emulator exited");
    Ok(())
}

/// Log whether a virtual port helper is available
async fn report_vport_tool() {
    let status = VPortToolChecker::new().check().await;
    if status.is_installed {
        info!(
            "Virtual port tool {} {}",
            status.tool_name,
            status.version.as_deref().unwrap_or("(version unknown)")
        );
    } else {
        warn!(
            "Virtual port tool {} not found. {}",
            status.tool_name,
            status.install_instruction().replace('\n', " ")
        );
    }
}

/// Install the Ctrl+C (and on unix SIGTERM) handlers
///
/// Handlers are registered when this is called, not when the returned future
/// is first polled, so signals arriving during startup are not lost.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            _ = wait_for(interrupt, "SIGINT") => {}
            _ = wait_for(terminate, "SIGTERM") => {}
        }
    }
}

#[cfg(unix)]
async fn wait_for(signal: std::io::Result<tokio::signal::unix::Signal>, name: &str) {
    match signal {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            warn!("Failed to listen for {}: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    let ctrl_c = tokio::signal::windows::ctrl_c();

    async move {
        match ctrl_c {
            Ok(mut ctrl_c) => {
                ctrl_c.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
