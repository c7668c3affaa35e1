// tests/command_runner.rs
#![cfg(unix)]

mod common;
use crate::common::{host_environment, init_tracing};

use std::error::Error;

use tempfile::tempdir;

use packsible_dev::errors::DevServerError;
use packsible_dev::exec::{CommandOutcome, CommandRunner, CommandSpec, RealCommandRunner};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stdin_is_fed_and_stdout_captured() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let spec = CommandSpec::new("cat", dir.path(), host_environment())
        .stdin(b"a.txt\0b.txt\0".to_vec())
        .capture_stdout();

    let output = RealCommandRunner::new().run(spec).await?;

    assert_eq!(output.outcome, CommandOutcome::Success);
    assert_eq!(output.stdout, b"a.txt\0b.txt\0");
    Ok(())
}

#[tokio::test]
async fn command_runs_in_cwd_with_exactly_the_given_env() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let mut env = host_environment();
    env.insert("ONLY_HERE".to_string(), "42".to_string());
    env.remove("HOME");

    let spec = CommandSpec::shell("echo \"$ONLY_HERE:${HOME:-unset}\"; pwd", dir.path(), env)
        .capture_stdout();
    let output = RealCommandRunner::new().run(spec).await?;

    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("42:unset"));
    let cwd = std::fs::canonicalize(lines.next().unwrap_or_default())?;
    assert_eq!(cwd, std::fs::canonicalize(dir.path())?);
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_an_outcome_not_an_error() -> TestResult {
    let dir = tempdir()?;
    let spec = CommandSpec::shell("exit 6", dir.path(), host_environment());

    let output = RealCommandRunner::new().run(spec).await?;

    assert_eq!(output.outcome, CommandOutcome::Failed(6));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_program_is_a_spawn_error() -> TestResult {
    let dir = tempdir()?;
    let spec = CommandSpec::new("no-such-program-for-packsible-dev", dir.path(), host_environment());

    let result = RealCommandRunner::new().run(spec).await;

    match result {
        Err(DevServerError::SpawnFailed { program, .. }) => {
            assert_eq!(program, "no-such-program-for-packsible-dev");
        }
        other => panic!("Expected SpawnFailed, got: {:?}", other),
    }
    Ok(())
}
