// src/exec/command.rs

//! Pluggable command runner abstraction.
//!
//! The setup pipeline never builds `tokio::process::Command`s for its
//! one-shot steps directly; it describes them as [`CommandSpec`]s and hands
//! them to a [`CommandRunner`]. Production code uses [`RealCommandRunner`];
//! tests swap in a fake runner that records specs and scripts outcomes.
//!
//! The long-lived application process is *not* run through this trait, see
//! [`crate::exec::process`].

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{DevServerError, Result};
use crate::types::Environment;

/// Outcome of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Non-zero exit code, or `-1` when killed by a signal.
    Failed(i32),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }

    /// Exit code for error reporting (`0` on success).
    pub fn code(&self) -> i32 {
        match self {
            CommandOutcome::Success => 0,
            CommandOutcome::Failed(code) => *code,
        }
    }

    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if status.success() {
            CommandOutcome::Success
        } else {
            CommandOutcome::Failed(status.code().unwrap_or(-1))
        }
    }
}

/// Result of running a command: its outcome plus captured stdout, if any was
/// requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub outcome: CommandOutcome,
    pub stdout: Vec<u8>,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            outcome: CommandOutcome::Success,
            stdout: Vec::new(),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            outcome: CommandOutcome::Failed(code),
            stdout: Vec::new(),
        }
    }
}

/// Description of a one-shot external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete environment of the child; nothing is inherited.
    pub env: Environment,
    /// Bytes written to the child's stdin, which is closed afterwards.
    pub stdin: Option<Vec<u8>>,
    /// Capture stdout instead of inheriting it.
    pub capture_stdout: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env,
            stdin: None,
            capture_stdout: false,
        }
    }

    /// Run `cmd` through the platform shell.
    pub fn shell(cmd: &str, cwd: impl Into<PathBuf>, env: Environment) -> Self {
        if cfg!(windows) {
            Self::new("cmd", cwd, env).args(["/C", cmd])
        } else {
            Self::new("sh", cwd, env).args(["-c", cmd])
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Human-readable command line for logs and errors.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait abstracting how one-shot commands are executed.
///
/// A spawn failure is an `Err`; a command that ran and exited non-zero is an
/// `Ok` carrying [`CommandOutcome::Failed`]. Callers decide what a failure
/// means for them.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>>;
}

/// Runner backed by `tokio::process::Command`.
///
/// stderr is always inherited so setup output shows up in the daemon's
/// console, as does stdout unless `capture_stdout` is set.
#[derive(Debug, Clone, Default)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for RealCommandRunner {
    fn run(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>> {
        Box::pin(async move { run_command(spec).await })
    }
}

async fn run_command(mut spec: CommandSpec) -> Result<CommandOutput> {
    let command_line = spec.display();
    debug!(command = %command_line, cwd = ?spec.cwd, "running command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(&spec.env)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| DevServerError::SpawnFailed {
        program: spec.program.clone(),
        source,
    })?;

    if let Some(input) = spec.stdin.take() {
        if let Some(mut stdin) = child.stdin.take() {
            // stdin is written concurrently with draining stdout.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(error = %e, "child closed stdin early");
                }
            });
        }
    }

    let output = child.wait_with_output().await?;
    let outcome = CommandOutcome::from_status(output.status);

    debug!(
        command = %command_line,
        exit_code = outcome.code(),
        "command finished"
    );

    Ok(CommandOutput {
        outcome,
        stdout: output.stdout,
    })
}
