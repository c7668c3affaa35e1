// tests/source_loading.rs
#![cfg(unix)]

mod common;
use crate::common::fake_runner::FakeCommandRunner;
use crate::common::{host_environment, init_tracing};

use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

use packsible_dev::errors::DevServerError;
use packsible_dev::exec::RealCommandRunner;
use packsible_dev::exec::source::{ARCHIVE_NAME, load_source_to_app_dir};
use packsible_dev::types::Environment;

type TestResult = Result<(), Box<dyn Error>>;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn dir_entries(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect()
}

#[tokio::test]
async fn round_trip_copies_exactly_the_listed_files() -> TestResult {
    init_tracing();
    if !git_available() {
        eprintln!("git not available; skipping");
        return Ok(());
    }

    let source = tempdir()?;
    let app = tempdir()?;

    let status = Command::new("git")
        .args(["init", "-q"])
        .current_dir(source.path())
        .status()?;
    assert!(status.success());

    fs::write(source.path().join("f1"), "one")?;
    fs::write(source.path().join("f2"), "two")?;

    load_source_to_app_dir(
        &RealCommandRunner::new(),
        &host_environment(),
        source.path(),
        app.path(),
    )
    .await?;

    let entries = dir_entries(app.path())?;
    let expected: BTreeSet<String> = ["f1", "f2"].iter().map(|s| s.to_string()).collect();
    assert_eq!(entries, expected, "no archive or .git should remain");
    assert_eq!(fs::read_to_string(app.path().join("f1"))?, "one");
    assert_eq!(fs::read_to_string(app.path().join("f2"))?, "two");

    Ok(())
}

#[tokio::test]
async fn ignored_files_are_not_copied() -> TestResult {
    init_tracing();
    if !git_available() {
        eprintln!("git not available; skipping");
        return Ok(());
    }

    let source = tempdir()?;
    let app = tempdir()?;
    Command::new("git")
        .args(["init", "-q"])
        .current_dir(source.path())
        .status()?;

    fs::write(source.path().join(".gitignore"), "secret.txt\n")?;
    fs::write(source.path().join("secret.txt"), "hidden")?;
    fs::create_dir(source.path().join("src"))?;
    fs::write(source.path().join("src").join("main.py"), "print('hi')")?;

    load_source_to_app_dir(
        &RealCommandRunner::new(),
        &host_environment(),
        source.path(),
        app.path(),
    )
    .await?;

    assert!(app.path().join("src").join("main.py").exists());
    assert!(app.path().join(".gitignore").exists());
    assert!(!app.path().join("secret.txt").exists());
    assert!(!app.path().join(ARCHIVE_NAME).exists());

    Ok(())
}

#[tokio::test]
async fn listing_failure_aborts_before_packaging() -> TestResult {
    init_tracing();

    let app = tempdir()?;
    let runner = FakeCommandRunner::new();
    runner.fail_when("git ls-files", 128);

    let result =
        load_source_to_app_dir(&runner, &Environment::new(), Path::new("."), app.path()).await;

    match result {
        Err(DevServerError::LoadFailed { step, code }) => {
            assert_eq!(step, "listing source files");
            assert_eq!(code, 128);
        }
        other => panic!("Expected LoadFailed, got: {:?}", other),
    }
    assert_eq!(runner.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn unpack_failure_is_fatal_and_leaves_no_archive() -> TestResult {
    init_tracing();

    let app = tempdir()?;
    // Pretend packaging produced an archive.
    fs::write(app.path().join(ARCHIVE_NAME), "not really gzip")?;

    let runner = FakeCommandRunner::new();
    runner.fail_when("tar -xzf", 2);

    let result =
        load_source_to_app_dir(&runner, &Environment::new(), Path::new("."), app.path()).await;

    match result {
        Err(DevServerError::LoadFailed { step, code }) => {
            assert_eq!(step, "unpacking");
            assert_eq!(code, 2);
        }
        other => panic!("Expected LoadFailed, got: {:?}", other),
    }
    assert!(!app.path().join(ARCHIVE_NAME).exists());
    Ok(())
}

#[tokio::test]
async fn file_list_is_piped_into_tar() -> TestResult {
    use packsible_dev::exec::CommandOutput;
    use packsible_dev::exec::CommandOutcome;

    let app = tempdir()?;
    let runner = FakeCommandRunner::new();
    runner.respond_when(
        "git ls-files",
        CommandOutput {
            outcome: CommandOutcome::Success,
            stdout: b"a.txt\0dir/b.txt\0".to_vec(),
        },
    );

    load_source_to_app_dir(&runner, &Environment::new(), Path::new("/src"), app.path()).await?;

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].capture_stdout);
    assert_eq!(calls[1].program, "tar");
    assert_eq!(calls[1].cwd, Path::new("/src"));
    assert_eq!(calls[1].stdin.as_deref(), Some(&b"a.txt\0dir/b.txt\0"[..]));
    assert_eq!(calls[2].cwd, app.path());
    Ok(())
}
