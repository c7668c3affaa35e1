// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Almost everything is configured through `PACKSIBLE_DEV_*` environment
//! variables (see [`crate::config`]); the flags here only override the bind
//! address and control logging.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `packsible-dev`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "packsible-dev",
    version,
    about = "Development supervisor: rebuild and restart one application process over HTTP.",
    long_about = None
)]
pub struct CliArgs {
    /// Address to bind the control API to.
    ///
    /// Overrides `PACKSIBLE_DEV_HOST`.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the control API to.
    ///
    /// Overrides `PACKSIBLE_DEV_PORT`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PACKSIBLE_DEV_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
