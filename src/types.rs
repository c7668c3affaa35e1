use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment handed to every spawned command.
///
/// A `BTreeMap` keeps `GET /env` output stable between calls.
pub type Environment = BTreeMap<String, String>;

/// Options accepted by `refresh` (and `start`).
///
/// Mirrors the `refresh_options` object of the control API:
///
/// ```json
/// { "refresh_options": { "skip_setup": true } }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshOptions {
    /// Skip the setup command for this generation. Presetup scripts still run.
    pub skip_setup: bool,
}

/// Merge `diff` into `env`, key by key. Last write wins.
pub fn merge_environment(env: &mut Environment, diff: Environment) {
    for (key, value) in diff {
        env.insert(key, value);
    }
}
