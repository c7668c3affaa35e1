// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod server;
pub mod supervisor;
pub mod types;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::ServerConfig;
use crate::errors::DevServerError;
use crate::exec::RealCommandRunner;
use crate::supervisor::Supervisor;
use crate::types::RefreshOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (from `PACKSIBLE_DEV_*` variables, CLI overrides on top)
/// - the supervisor and its first worker
/// - the HTTP control API
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = config::load_from_env().context("loading configuration")?;
    apply_cli_overrides(&mut cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Bind before the first worker runs its setup, so the API is reachable
    // (and refresh requests queue) while setup is in progress.
    let listener = TcpListener::bind(cfg.bind_addr())
        .await
        .with_context(|| format!("binding control API to {}", cfg.bind_addr()))?;

    let supervisor = Arc::new(Supervisor::new(cfg, Arc::new(RealCommandRunner::new())));

    {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            match supervisor.start(RefreshOptions::default()).await {
                Ok(_) => {}
                // An early refresh request already started a worker.
                Err(DevServerError::WorkerAlreadyRunning { .. }) => {}
                Err(e) => error!(error = %e, "initial start failed; waiting for a refresh"),
            }
        });
    }

    server::serve(listener, Arc::clone(&supervisor), shutdown_signal()).await?;

    info!("stopping application before exit");
    supervisor.shutdown().await?;
    Ok(())
}

fn apply_cli_overrides(cfg: &mut ServerConfig, args: &CliArgs) {
    if let Some(ref host) = args.host {
        cfg.host = host.clone();
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received; shutting down");
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &ServerConfig) {
    println!("packsible-dev dry-run");
    println!("  command: {:?}", cfg.command);
    match cfg.setup_command {
        Some(ref setup) => println!("  setup_command: {setup}"),
        None => println!("  setup_command: (none)"),
    }
    println!("  source_dir: {}", cfg.source_dir.display());
    println!("  app_dir: {}", cfg.app_dir.display());
    println!("  load_to_app_dir: {}", cfg.load_to_app_dir);
    println!("  presetup_dir: {}", cfg.presetup_dir.display());
    println!("  listen: {}", cfg.bind_addr());
    println!(
        "  signal_poll_interval: {:?}",
        cfg.timing.signal_poll_interval
    );
    println!("  kill_retry_interval: {:?}", cfg.timing.kill_retry_interval);
    match cfg.timing.kill_max_attempts {
        Some(max) => println!("  kill_max_attempts: {max}"),
        None => println!("  kill_max_attempts: unbounded"),
    }
}
