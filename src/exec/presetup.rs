// src/exec/presetup.rs

//! Presetup scripts: executables dropped into a well-known directory that run
//! before every worker's setup command.
//!
//! Presetup is best-effort. A script that fails (or cannot even be spawned)
//! is reported with `warn!` and the pipeline carries on.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::command::{CommandRunner, CommandSpec};
use crate::types::Environment;

/// What happened during one presetup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetupReport {
    /// Scripts that were run, in execution order.
    pub ran: Vec<String>,
    /// Subset of `ran` that failed.
    pub failed: Vec<String>,
}

/// List eligible presetup scripts, sorted by file name.
///
/// A missing directory yields an empty list. Only regular files with the
/// execute bit set for owner, group *and* other are eligible.
pub async fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = ?dir, "presetup directory does not exist; skipping");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut scripts = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Follow symlinks, like the exec itself will.
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                warn!(path = ?path, error = %e, "cannot stat presetup entry; ignoring");
                continue;
            }
        };
        if metadata.is_file() && is_fully_executable(&metadata) {
            scripts.push(path);
        } else {
            debug!(path = ?path, "presetup entry is not executable by everyone; ignoring");
        }
    }

    scripts.sort();
    Ok(scripts)
}

#[cfg(unix)]
fn is_fully_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 == 0o111
}

#[cfg(not(unix))]
fn is_fully_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// Run every eligible script in `dir` with `env`, from inside `dir`.
///
/// Only a failure to read the directory itself is returned as an error; the
/// caller treats even that as non-fatal.
pub async fn run_presetup_scripts(
    runner: &dyn CommandRunner,
    env: &Environment,
    dir: &Path,
) -> Result<PresetupReport> {
    let scripts = discover_scripts(dir).await?;
    let mut report = PresetupReport::default();

    for script in scripts {
        let Some(name) = script.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        info!(script = %name, "running presetup script");
        report.ran.push(name.clone());

        // Relative program paths would resolve against our cwd, not `dir`.
        let result = match std::path::absolute(&script) {
            Ok(program) => {
                let spec = CommandSpec::new(program.to_string_lossy(), dir, env.clone());
                runner.run(spec).await
            }
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(output) if output.outcome.is_success() => {
                debug!(script = %name, "presetup script succeeded");
            }
            Ok(output) => {
                warn!(
                    script = %name,
                    exit_code = output.outcome.code(),
                    "presetup script failed; continuing"
                );
                report.failed.push(name);
            }
            Err(e) => {
                warn!(script = %name, error = %e, "presetup script could not be run; continuing");
                report.failed.push(name);
            }
        }
    }

    Ok(report)
}
