#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use packsible_dev::config::{LifecycleTiming, ServerConfig};

/// Builder for `ServerConfig` to simplify test setup.
///
/// Defaults are test-friendly: short poll intervals, a presetup directory
/// that does not exist, and `sleep 1000` as the application.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new(app_dir: impl AsRef<Path>) -> Self {
        let app_dir = app_dir.as_ref().to_path_buf();
        Self {
            config: ServerConfig {
                command: vec!["sleep".to_string(), "1000".to_string()],
                setup_command: None,
                source_dir: PathBuf::from("."),
                presetup_dir: app_dir.join("no-such-presetup-dir"),
                app_dir,
                load_to_app_dir: false,
                host: "127.0.0.1".to_string(),
                port: 0,
                timing: LifecycleTiming {
                    signal_poll_interval: Duration::from_millis(50),
                    kill_retry_interval: Duration::from_millis(20),
                    kill_max_attempts: None,
                },
            },
        }
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.config.command = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn setup_command(mut self, cmd: &str) -> Self {
        self.config.setup_command = Some(cmd.to_string());
        self
    }

    pub fn source_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.source_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn presetup_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.presetup_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn load_to_app_dir(mut self, val: bool) -> Self {
        self.config.load_to_app_dir = val;
        self
    }

    pub fn signal_poll_interval(mut self, interval: Duration) -> Self {
        self.config.timing.signal_poll_interval = interval;
        self
    }

    pub fn kill_max_attempts(mut self, attempts: u32) -> Self {
        self.config.timing.kill_max_attempts = Some(attempts);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
