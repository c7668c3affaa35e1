// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] provides the `CommandRunner` trait used for every one-shot
//!   step (git, tar, presetup scripts, the setup command) plus the
//!   `tokio::process` backed `RealCommandRunner`.
//! - [`source`] packages the source tree into the application directory.
//! - [`presetup`] discovers and runs presetup scripts, best-effort.
//! - [`process`] launches the long-lived application and drives its
//!   termination.

pub mod command;
pub mod presetup;
pub mod process;
pub mod source;

pub use command::{CommandOutcome, CommandOutput, CommandRunner, CommandSpec, RealCommandRunner};
pub use presetup::PresetupReport;
