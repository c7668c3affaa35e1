// src/worker/state.rs

//! Worker lifecycle states and the pure setup-pipeline ordering.
//!
//! Nothing in here performs IO; [`crate::worker::pipeline`] is the shell that
//! executes each stage.

use serde::Serialize;

/// Observable state of one worker generation.
///
/// ```text
/// Initializing -> [Loading] -> PreSetup -> [Setup] -> Running -> Terminating -> Terminated
///                     \                       \
///                      `-----------------------`--> Aborted
/// ```
///
/// `Exited` replaces `Running` when the application quits on its own; the
/// worker keeps waiting for its kill signal either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkerState {
    Initializing,
    Loading,
    PreSetup,
    Setup,
    Running { pid: u32 },
    Exited { code: Option<i32> },
    Terminating,
    Terminated,
    Aborted { reason: String },
}

impl WorkerState {
    /// No further transitions will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Terminated | WorkerState::Aborted { .. })
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            WorkerState::Running { pid } => Some(*pid),
            _ => None,
        }
    }
}

/// Which optional stages a worker generation goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePlan {
    pub load_source: bool,
    pub run_setup: bool,
}

impl PipelinePlan {
    pub fn new(load_to_app_dir: bool, skip_setup: bool, has_setup_command: bool) -> Self {
        Self {
            load_source: load_to_app_dir,
            run_setup: !skip_setup && has_setup_command,
        }
    }
}

/// A stage of the setup pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    Loading,
    PreSetup,
    Setup,
}

impl Stage {
    pub fn first() -> Self {
        Stage::Initializing
    }

    /// The stage after `self`, or `None` when the application should be
    /// launched.
    pub fn next(self, plan: &PipelinePlan) -> Option<Stage> {
        match self {
            Stage::Initializing if plan.load_source => Some(Stage::Loading),
            Stage::Initializing | Stage::Loading => Some(Stage::PreSetup),
            Stage::PreSetup if plan.run_setup => Some(Stage::Setup),
            Stage::PreSetup | Stage::Setup => None,
        }
    }

    /// Every stage `plan` will go through, in order.
    pub fn sequence(plan: &PipelinePlan) -> Vec<Stage> {
        std::iter::successors(Some(Stage::first()), |stage| stage.next(plan)).collect()
    }
}

impl From<Stage> for WorkerState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Initializing => WorkerState::Initializing,
            Stage::Loading => WorkerState::Loading,
            Stage::PreSetup => WorkerState::PreSetup,
            Stage::Setup => WorkerState::Setup,
        }
    }
}
