// src/config/loader.rs

use crate::config::model::{RawServerConfig, ServerConfig};
use crate::errors::Result;

/// Read the `PACKSIBLE_DEV_*` variables of the current process and validate
/// them.
///
/// This is the entry point used by `run()`; it is called exactly once at
/// startup.
pub fn load_from_env() -> Result<ServerConfig> {
    load_from_vars(std::env::vars())
}

/// Same as [`load_from_env`], but reads from an arbitrary set of variables.
///
/// Tests use this instead of mutating the real process environment.
pub fn load_from_vars<I, K, V>(vars: I) -> Result<ServerConfig>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let raw = RawServerConfig::from_vars(vars);
    ServerConfig::try_from(raw)
}
