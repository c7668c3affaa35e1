// tests/worker_lifecycle.rs
#![cfg(unix)]

mod common;
use crate::common::builders::ServerConfigBuilder;
use crate::common::fake_runner::FakeCommandRunner;
use crate::common::{host_environment, init_tracing, pid_alive, with_timeout};

use std::error::Error;
use std::sync::Arc;

use tempfile::tempdir;

use packsible_dev::errors::DevServerError;
use packsible_dev::types::RefreshOptions;
use packsible_dev::worker::{WorkerConfig, WorkerState, spawn_worker};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn worker_runs_then_terminates_on_stop() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let server = ServerConfigBuilder::new(dir.path()).build();
    let config = WorkerConfig::new(&server, 7, host_environment(), RefreshOptions::default());

    let pending = spawn_worker(config, Arc::new(FakeCommandRunner::new()));
    let mut observer = pending.observer();
    assert_eq!(observer.generation(), 7);

    let mut handle = with_timeout(pending.wait_ready()).await?;
    let pid = handle.pid();
    assert!(pid_alive(pid));
    assert_eq!(handle.status().state, WorkerState::Running { pid });
    assert_eq!(handle.generation(), 7);

    with_timeout(handle.stop()).await?;

    assert!(!pid_alive(pid), "application should be reaped after stop");
    let final_state = observer.wait_for(WorkerState::is_terminal).await;
    assert_eq!(final_state, WorkerState::Terminated);
    Ok(())
}

#[tokio::test]
async fn failed_setup_aborts_without_launching() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let marker = dir.path().join("launched");
    let server = ServerConfigBuilder::new(dir.path())
        .command(&["touch", marker.to_str().unwrap()])
        .setup_command("make deps")
        .build();
    let config = WorkerConfig::new(&server, 1, host_environment(), RefreshOptions::default());

    let runner = FakeCommandRunner::new();
    runner.fail_when("make deps", 2);

    let pending = spawn_worker(config, Arc::new(runner));
    let observer = pending.observer();
    let result = with_timeout(pending.wait_ready()).await;

    match result {
        Err(DevServerError::SetupFailed { code, .. }) => assert_eq!(code, 2),
        other => panic!("Expected SetupFailed, got: {:?}", other),
    }
    assert!(matches!(observer.state(), WorkerState::Aborted { .. }));
    assert!(!marker.exists());
    Ok(())
}

#[tokio::test]
async fn unlaunchable_application_aborts_the_worker() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let server = ServerConfigBuilder::new(dir.path())
        .command(&["no-such-binary-for-packsible-dev"])
        .build();
    let config = WorkerConfig::new(&server, 1, host_environment(), RefreshOptions::default());

    let pending = spawn_worker(config, Arc::new(FakeCommandRunner::new()));
    let observer = pending.observer();
    let result = with_timeout(pending.wait_ready()).await;

    assert!(matches!(result, Err(DevServerError::SpawnFailed { .. })));
    assert!(matches!(observer.state(), WorkerState::Aborted { .. }));
    Ok(())
}

#[tokio::test]
async fn skip_setup_does_not_run_the_setup_command() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let server = ServerConfigBuilder::new(dir.path())
        .setup_command("make deps")
        .build();
    let config = WorkerConfig::new(
        &server,
        1,
        host_environment(),
        RefreshOptions { skip_setup: true },
    );

    let runner = FakeCommandRunner::new();
    let pending = spawn_worker(config, Arc::new(runner.clone()));
    let mut handle = with_timeout(pending.wait_ready()).await?;

    assert!(runner.calls().is_empty());
    with_timeout(handle.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn application_exiting_on_its_own_is_observed() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let server = ServerConfigBuilder::new(dir.path())
        .command(&["sh", "-c", "exit 3"])
        .build();
    let config = WorkerConfig::new(&server, 1, host_environment(), RefreshOptions::default());

    let pending = spawn_worker(config, Arc::new(FakeCommandRunner::new()));
    let mut observer = pending.observer();
    let mut handle = with_timeout(pending.wait_ready()).await?;

    let state = with_timeout(observer.wait_for(|s| matches!(s, WorkerState::Exited { .. }))).await;
    assert_eq!(state, WorkerState::Exited { code: Some(3) });

    // Stopping an exited worker still completes.
    with_timeout(handle.stop()).await?;
    assert_eq!(observer.state(), WorkerState::Terminated);
    Ok(())
}

#[tokio::test]
async fn worker_sees_only_its_environment_snapshot() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let out = dir.path().join("env.out");
    let server = ServerConfigBuilder::new(dir.path())
        .command(&["sh", "-c", "echo \"$MODE\" > env.out; sleep 1000"])
        .build();

    let mut env = host_environment();
    env.insert("MODE".to_string(), "snapshot".to_string());
    let config = WorkerConfig::new(&server, 1, env, RefreshOptions::default());

    let mut handle = with_timeout(spawn_worker(config, Arc::new(FakeCommandRunner::new())).wait_ready())
        .await?;

    assert!(common::wait_for_file(&out).await);
    // The file may exist before the echo finished writing.
    let mut contents = String::new();
    for _ in 0..100 {
        contents = std::fs::read_to_string(&out)?;
        if contents.ends_with('\n') {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(contents, "snapshot\n");

    with_timeout(handle.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn exhausted_stop_keeps_the_process_until_a_later_stop_reaps_it() -> TestResult {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    init_tracing();

    let dir = tempdir()?;
    let server = ServerConfigBuilder::new(dir.path()).kill_max_attempts(0).build();
    let config = WorkerConfig::new(&server, 4, host_environment(), RefreshOptions::default());

    let mut handle =
        with_timeout(spawn_worker(config, Arc::new(FakeCommandRunner::new())).wait_ready()).await?;
    let pid = handle.pid();

    let result = with_timeout(handle.stop()).await;
    assert!(matches!(
        result,
        Err(DevServerError::TerminationExhausted { attempts: 0, .. })
    ));
    assert!(!handle.is_stopped());
    assert!(pid_alive(pid));
    assert_eq!(handle.status().state, WorkerState::Terminating);

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)?;
    let mut reaped = false;
    for _ in 0..100 {
        if handle.stop().await.is_ok() {
            reaped = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert!(reaped);
    assert!(handle.is_stopped());
    assert!(!pid_alive(pid));
    assert_eq!(handle.status().state, WorkerState::Terminated);

    // Stopping again is a no-op.
    handle.stop().await?;
    Ok(())
}
