// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub const ENV_COMMAND: &str = "PACKSIBLE_DEV_COMMAND";
pub const ENV_SETUP_COMMAND: &str = "PACKSIBLE_DEV_SETUP_COMMAND";
pub const ENV_SOURCE_DIR: &str = "PACKSIBLE_DEV_SOURCE_DIR";
pub const ENV_APP_DIR: &str = "PACKSIBLE_DEV_APP_DIR";
pub const ENV_LOAD_TO_APP_DIR: &str = "PACKSIBLE_DEV_LOAD_TO_APP_DIR";
pub const ENV_PRESETUP_DIR: &str = "PACKSIBLE_DEV_PRESETUP_DIR";
pub const ENV_HOST: &str = "PACKSIBLE_DEV_HOST";
pub const ENV_PORT: &str = "PACKSIBLE_DEV_PORT";
pub const ENV_SIGNAL_POLL_MS: &str = "PACKSIBLE_DEV_SIGNAL_POLL_MS";
pub const ENV_KILL_RETRY_MS: &str = "PACKSIBLE_DEV_KILL_RETRY_MS";
pub const ENV_KILL_MAX_ATTEMPTS: &str = "PACKSIBLE_DEV_KILL_MAX_ATTEMPTS";

pub const DEFAULT_APP_DIR: &str = "/app";
pub const DEFAULT_PRESETUP_DIR: &str = "/packsible-dev-server/presetup";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 31111;
pub const DEFAULT_SIGNAL_POLL: Duration = Duration::from_secs(10);
pub const DEFAULT_KILL_RETRY: Duration = Duration::from_millis(500);

/// Configuration exactly as found in the process environment.
///
/// Every field is the untouched string value of its `PACKSIBLE_DEV_*`
/// variable (or `None` when unset). Turning this into a [`ServerConfig`]
/// applies defaults and validation, see `validate.rs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawServerConfig {
    pub command: Option<String>,
    pub setup_command: Option<String>,
    pub source_dir: Option<String>,
    pub app_dir: Option<String>,
    pub load_to_app_dir: Option<String>,
    pub presetup_dir: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub signal_poll_ms: Option<String>,
    pub kill_retry_ms: Option<String>,
    pub kill_max_attempts: Option<String>,
}

impl RawServerConfig {
    /// Pick the known `PACKSIBLE_DEV_*` keys out of a set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawServerConfig::default();
        for (key, value) in vars {
            let slot = match key.as_ref() {
                ENV_COMMAND => &mut raw.command,
                ENV_SETUP_COMMAND => &mut raw.setup_command,
                ENV_SOURCE_DIR => &mut raw.source_dir,
                ENV_APP_DIR => &mut raw.app_dir,
                ENV_LOAD_TO_APP_DIR => &mut raw.load_to_app_dir,
                ENV_PRESETUP_DIR => &mut raw.presetup_dir,
                ENV_HOST => &mut raw.host,
                ENV_PORT => &mut raw.port,
                ENV_SIGNAL_POLL_MS => &mut raw.signal_poll_ms,
                ENV_KILL_RETRY_MS => &mut raw.kill_retry_ms,
                ENV_KILL_MAX_ATTEMPTS => &mut raw.kill_max_attempts,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        raw
    }
}

/// Validated daemon configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    /// Application command as an argument vector.
    pub command: Vec<String>,

    /// Setup command, run through the platform shell.
    pub setup_command: Option<String>,

    pub source_dir: PathBuf,
    pub app_dir: PathBuf,

    /// Package `source_dir` into `app_dir` before setup.
    pub load_to_app_dir: bool,

    pub presetup_dir: PathBuf,

    pub host: String,
    pub port: u16,

    pub timing: LifecycleTiming,
}

impl ServerConfig {
    /// `host:port` for the control API listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Intervals that drive the worker's wait and termination loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleTiming {
    /// How often a running worker re-checks its kill signal when no wakeup
    /// arrived.
    pub signal_poll_interval: Duration,

    /// Delay between termination attempts.
    pub kill_retry_interval: Duration,

    /// Give up after this many termination attempts. `None` retries forever.
    pub kill_max_attempts: Option<u32>,
}

impl Default for LifecycleTiming {
    fn default() -> Self {
        Self {
            signal_poll_interval: DEFAULT_SIGNAL_POLL,
            kill_retry_interval: DEFAULT_KILL_RETRY,
            kill_max_attempts: None,
        }
    }
}
