// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The OS refused to create a process.
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Setup command failed with exit code {code}: {command}")]
    SetupFailed { command: String, code: i32 },

    #[error("Loading source failed during {step} (exit code {code})")]
    LoadFailed { step: &'static str, code: i32 },

    #[error("Application process {pid} still alive after {attempts} termination attempts")]
    TerminationExhausted { pid: u32, attempts: u32 },

    #[error("Worker {generation} is already running; refresh to replace it")]
    WorkerAlreadyRunning { generation: u64 },

    /// The worker task ended without reporting (panic or dropped channel).
    #[error("Worker {generation} was lost: {reason}")]
    WorkerLost { generation: u64, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevServerError>;
