#![allow(dead_code)]

pub use packsible_dev_test_utils::builders;
pub use packsible_dev_test_utils::fake_runner;
pub use packsible_dev_test_utils::{host_environment, init_tracing};

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Whether a process with this pid currently exists.
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), None::<Signal>).is_ok()
}

/// Poll `path` until it exists (or give up after ~5s).
pub async fn wait_for_file(path: &std::path::Path) -> bool {
    for _ in 0..500 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
