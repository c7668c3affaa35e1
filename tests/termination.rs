// tests/termination.rs
#![cfg(unix)]

mod common;
use crate::common::{host_environment, init_tracing, pid_alive, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use packsible_dev::errors::DevServerError;
use packsible_dev::exec::process::{spawn_application, terminate};
use packsible_dev::worker::kill_signal;

type TestResult = Result<(), Box<dyn Error>>;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn terminate_reaps_a_cooperative_process() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let mut child = spawn_application(&argv(&["sleep", "1000"]), dir.path(), &host_environment())?;
    let pid = child.id().expect("child has a pid");
    assert!(pid_alive(pid));

    with_timeout(terminate(&mut child, Duration::from_millis(20), None)).await?;

    assert!(!pid_alive(pid), "pid {pid} should be gone after terminate");
    Ok(())
}

#[tokio::test]
async fn terminate_kills_a_process_that_ignores_sigterm() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let mut child = spawn_application(
        &argv(&["sh", "-c", "trap '' TERM; while true; do sleep 1; done"]),
        dir.path(),
        &host_environment(),
    )?;
    let pid = child.id().expect("child has a pid");

    let status = with_timeout(terminate(&mut child, Duration::from_millis(20), None)).await?;

    assert!(!status.success());
    assert!(!pid_alive(pid));
    Ok(())
}

#[tokio::test]
async fn terminate_on_an_exited_process_returns_its_status() -> TestResult {
    let dir = tempdir()?;
    let mut child = spawn_application(&argv(&["sh", "-c", "exit 4"]), dir.path(), &host_environment())?;
    child.wait().await?;

    let status = terminate(&mut child, Duration::from_millis(20), Some(1)).await?;
    assert_eq!(status.code(), Some(4));
    Ok(())
}

#[tokio::test]
async fn zero_attempt_budget_reports_exhaustion() -> TestResult {
    let dir = tempdir()?;
    let mut child = spawn_application(&argv(&["sleep", "1000"]), dir.path(), &host_environment())?;
    let pid = child.id().expect("child has a pid");

    let result = terminate(&mut child, Duration::from_millis(20), Some(0)).await;
    match result {
        Err(DevServerError::TerminationExhausted { pid: reported, attempts }) => {
            assert_eq!(reported, pid);
            assert_eq!(attempts, 0);
        }
        other => panic!("Expected TerminationExhausted, got: {:?}", other),
    }

    // Clean up for real.
    terminate(&mut child, Duration::from_millis(20), None).await?;
    Ok(())
}

#[tokio::test]
async fn relative_program_paths_resolve_against_the_app_dir() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    let bin = dir.path().join("bin");
    std::fs::create_dir(&bin)?;
    let script = bin.join("server");
    std::fs::write(&script, "#!/bin/sh\ntouch started\n")?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let mut child = spawn_application(&argv(&["./bin/server"]), dir.path(), &host_environment())?;
    let status = with_timeout(child.wait()).await?;

    assert!(status.success());
    assert!(dir.path().join("started").exists());
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() -> TestResult {
    let dir = tempdir()?;
    let result = spawn_application(
        &argv(&["definitely-not-a-real-program-xyz"]),
        dir.path(),
        &host_environment(),
    );
    assert!(matches!(result, Err(DevServerError::SpawnFailed { .. })));
    Ok(())
}

#[tokio::test]
async fn kill_watch_times_out_until_set() {
    let (signal, mut watch) = kill_signal();

    let started = Instant::now();
    assert!(!watch.wait_timeout(Duration::from_millis(30)).await);
    assert!(started.elapsed() >= Duration::from_millis(30));

    signal.set();
    assert!(signal.is_set());
    assert!(watch.wait_timeout(Duration::from_secs(60)).await);
    // Stays set.
    assert!(watch.wait_timeout(Duration::from_secs(60)).await);
}

#[tokio::test]
async fn kill_watch_wakes_up_early_when_set() {
    let (signal, mut watch) = kill_signal();

    let setter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.set();
        signal
    });

    let started = Instant::now();
    assert!(watch.wait_timeout(Duration::from_secs(30)).await);
    assert!(started.elapsed() < Duration::from_secs(10));
    let _signal = setter.await.expect("setter task");
}

#[tokio::test]
async fn dropped_kill_signal_counts_as_set() {
    let (signal, mut watch) = kill_signal();
    drop(signal);
    assert!(watch.wait_timeout(Duration::from_secs(30)).await);
}
