// src/exec/source.rs

//! Copy the source tree into the application directory.
//!
//! The file list comes from git (tracked files plus untracked files that are
//! not ignored), is packed into an archive inside the application directory,
//! unpacked there and the archive removed. Every step is an argument vector;
//! no paths are interpolated into shell strings.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::{DevServerError, Result};
use crate::exec::command::{CommandRunner, CommandSpec};
use crate::types::Environment;

/// Intermediate archive name, created and removed inside the app directory.
pub const ARCHIVE_NAME: &str = "build.tar.gz";

pub async fn load_source_to_app_dir(
    runner: &dyn CommandRunner,
    env: &Environment,
    source_dir: &Path,
    app_dir: &Path,
) -> Result<()> {
    info!(source = ?source_dir, app = ?app_dir, "loading source into app directory");

    let listing = runner
        .run(
            CommandSpec::new("git", source_dir, env.clone())
                .args(["ls-files", "-c", "-o", "--exclude-standard", "-z"])
                .capture_stdout(),
        )
        .await?;
    if !listing.outcome.is_success() {
        return Err(DevServerError::LoadFailed {
            step: "listing source files",
            code: listing.outcome.code(),
        });
    }
    debug!(
        files = listing.stdout.split(|b| *b == 0).filter(|f| !f.is_empty()).count(),
        "collected source file list"
    );

    // tar runs from the source directory, so the archive path must be absolute.
    let archive = std::path::absolute(app_dir)?.join(ARCHIVE_NAME);
    let packed = runner
        .run(
            CommandSpec::new("tar", source_dir, env.clone())
                .arg("-czf")
                .arg(archive.to_string_lossy())
                .args(["--null", "-T", "-"])
                .stdin(listing.stdout),
        )
        .await?;
    if !packed.outcome.is_success() {
        remove_archive(&archive).await;
        return Err(DevServerError::LoadFailed {
            step: "packaging",
            code: packed.outcome.code(),
        });
    }

    let unpacked = runner
        .run(CommandSpec::new("tar", app_dir, env.clone()).args(["-xzf", ARCHIVE_NAME]))
        .await;
    remove_archive(&archive).await;

    let unpacked = unpacked?;
    if !unpacked.outcome.is_success() {
        return Err(DevServerError::LoadFailed {
            step: "unpacking",
            code: unpacked.outcome.code(),
        });
    }

    info!(app = ?app_dir, "source loaded");
    Ok(())
}

async fn remove_archive(archive: &Path) {
    match tokio::fs::remove_file(archive).await {
        Ok(()) => debug!(archive = ?archive, "removed intermediate archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(archive = ?archive, error = %e, "could not remove intermediate archive"),
    }
}
