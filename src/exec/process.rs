// src/exec/process.rs

//! The long-lived application process: launching it and making sure it dies.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::{DevServerError, Result};
use crate::types::Environment;

/// Spawn the application command (an argument vector, never a shell string)
/// inside `app_dir` with exactly `env`.
///
/// stdout/stderr are inherited so the application's output is the daemon's
/// output.
pub fn spawn_application(argv: &[String], app_dir: &Path, env: &Environment) -> Result<Child> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        DevServerError::ConfigError("application command is empty".to_string())
    })?;
    let program = resolve_program(program, app_dir);

    let mut cmd = Command::new(&program);
    cmd.args(args)
        .current_dir(app_dir)
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    cmd.spawn().map_err(|source| DevServerError::SpawnFailed {
        program: program.to_string_lossy().into_owned(),
        source,
    })
}

/// `./server` style programs are relative to the app directory; bare names
/// go through `PATH`.
fn resolve_program(program: &str, app_dir: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        app_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Kill `child` and reap it.
///
/// Every attempt asks politely (SIGTERM) and then forcefully (SIGKILL), waits
/// `retry_interval` and checks again. With `max_attempts = None` this loops
/// until the process is gone; otherwise it gives up with
/// [`DevServerError::TerminationExhausted`].
///
/// Returns the exit status of the reaped process.
pub async fn terminate(
    child: &mut Child,
    retry_interval: Duration,
    max_attempts: Option<u32>,
) -> Result<ExitStatus> {
    let pid = child.id().unwrap_or_default();
    let mut attempts: u32 = 0;

    loop {
        // try_wait reaps the child once it has exited.
        if let Some(status) = child.try_wait()? {
            info!(pid, attempts, ?status, "application process terminated");
            return Ok(status);
        }

        if let Some(max) = max_attempts {
            if attempts >= max {
                warn!(pid, attempts, "giving up on terminating application process");
                return Err(DevServerError::TerminationExhausted { pid, attempts });
            }
        }

        attempts += 1;
        debug!(pid, attempt = attempts, "sending termination signals");
        request_graceful_stop(child);
        if let Err(e) = child.start_kill() {
            // Typically the process exited between try_wait and here.
            debug!(pid, error = %e, "SIGKILL not delivered");
        }

        tokio::time::sleep(retry_interval).await;
    }
}

#[cfg(unix)]
fn request_graceful_stop(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM not delivered");
    }
}

#[cfg(not(unix))]
fn request_graceful_stop(_child: &Child) {}
