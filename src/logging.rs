// src/logging.rs

//! Tracing subscriber for the daemon.
//!
//! `--log-level` sets one level for everything. Without it,
//! `PACKSIBLE_DEV_LOG` is read as a full `EnvFilter` directive string
//! (`packsible_dev=debug,hyper=warn`). Otherwise `info`.
//!
//! Logs go to STDERR; the application and setup commands inherit STDOUT.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PACKSIBLE_DEV_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let directive = filter_directive(cli_level, env_value.as_deref());

    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    if let Some(e) = rejected {
        tracing::warn!(
            var = LOG_ENV_VAR,
            directive = %directive,
            error = %e,
            "ignoring unparseable log filter; using {DEFAULT_DIRECTIVE}"
        );
    }
    Ok(())
}

/// The filter directive to use, in priority order: CLI level, then a
/// non-blank `PACKSIBLE_DEV_LOG`, then the default.
fn filter_directive(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_DIRECTIVE.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
