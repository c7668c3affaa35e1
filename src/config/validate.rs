// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{
    LifecycleTiming, RawServerConfig, ServerConfig, DEFAULT_APP_DIR, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_PRESETUP_DIR, ENV_COMMAND, ENV_KILL_MAX_ATTEMPTS,
    ENV_KILL_RETRY_MS, ENV_PORT, ENV_SIGNAL_POLL_MS,
};
use crate::errors::{DevServerError, Result};

impl TryFrom<RawServerConfig> for ServerConfig {
    type Error = DevServerError;

    fn try_from(raw: RawServerConfig) -> std::result::Result<Self, Self::Error> {
        let command = parse_command(raw.command.as_deref())?;
        let setup_command = raw.setup_command.filter(|s| !s.trim().is_empty());

        let source_dir = match raw.source_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let app_dir = PathBuf::from(raw.app_dir.as_deref().unwrap_or(DEFAULT_APP_DIR));
        let presetup_dir =
            PathBuf::from(raw.presetup_dir.as_deref().unwrap_or(DEFAULT_PRESETUP_DIR));

        let load_to_app_dir = raw
            .load_to_app_dir
            .as_deref()
            .map(parse_flag)
            .unwrap_or(false);

        let host = raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match raw.port.as_deref() {
            Some(p) => p.trim().parse::<u16>().map_err(|e| {
                DevServerError::ConfigError(format!("{ENV_PORT} must be a port number, got '{p}': {e}"))
            })?,
            None => DEFAULT_PORT,
        };

        let defaults = LifecycleTiming::default();
        let timing = LifecycleTiming {
            signal_poll_interval: parse_millis(ENV_SIGNAL_POLL_MS, raw.signal_poll_ms.as_deref())?
                .unwrap_or(defaults.signal_poll_interval),
            kill_retry_interval: parse_millis(ENV_KILL_RETRY_MS, raw.kill_retry_ms.as_deref())?
                .unwrap_or(defaults.kill_retry_interval),
            kill_max_attempts: parse_max_attempts(raw.kill_max_attempts.as_deref())?,
        };

        Ok(ServerConfig {
            command,
            setup_command,
            source_dir,
            app_dir,
            load_to_app_dir,
            presetup_dir,
            host,
            port,
            timing,
        })
    }
}

/// Split the application command line into an argument vector.
pub fn parse_command(command: Option<&str>) -> Result<Vec<String>> {
    let line = command.ok_or_else(|| {
        DevServerError::ConfigError(format!("{ENV_COMMAND} must be set"))
    })?;

    let argv = shell_words::split(line).map_err(|e| {
        DevServerError::ConfigError(format!("{ENV_COMMAND} could not be parsed ({e}): {line}"))
    })?;

    if argv.is_empty() {
        return Err(DevServerError::ConfigError(format!(
            "{ENV_COMMAND} must not be empty"
        )));
    }

    Ok(argv)
}

/// String booleans: only a case-insensitive `"true"` enables the flag.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_millis(name: &str, value: Option<&str>) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let ms: u64 = value.trim().parse().map_err(|e| {
        DevServerError::ConfigError(format!("{name} must be a number of milliseconds, got '{value}': {e}"))
    })?;
    if ms == 0 {
        return Err(DevServerError::ConfigError(format!("{name} must be >= 1 (got 0)")));
    }
    Ok(Some(Duration::from_millis(ms)))
}

fn parse_max_attempts(value: Option<&str>) -> Result<Option<u32>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let attempts: u32 = value.trim().parse().map_err(|e| {
        DevServerError::ConfigError(format!(
            "{ENV_KILL_MAX_ATTEMPTS} must be a positive integer, got '{value}': {e}"
        ))
    })?;
    if attempts == 0 {
        return Err(DevServerError::ConfigError(format!(
            "{ENV_KILL_MAX_ATTEMPTS} must be >= 1 (got 0)"
        )));
    }
    Ok(Some(attempts))
}
