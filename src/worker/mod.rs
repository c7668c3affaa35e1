// src/worker/mod.rs

//! A worker owns one generation of the application process.
//!
//! Each worker runs as its own Tokio task:
//! 1. the setup pipeline ([`pipeline`]),
//! 2. launching the application command,
//! 3. idling until its [`KillSignal`] is set,
//! 4. terminating and reaping the application.
//!
//! The supervisor only ever talks to a worker through a [`WorkerHandle`].

pub mod pipeline;
pub mod signal;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{LifecycleTiming, ServerConfig};
use crate::errors::{DevServerError, Result};
use crate::exec::command::CommandRunner;
use crate::exec::process::{spawn_application, terminate};
use crate::types::{Environment, RefreshOptions};

pub use pipeline::SetupPipeline;
pub use signal::{KillSignal, KillWatch, kill_signal};
pub use state::{PipelinePlan, Stage, WorkerState};

/// Immutable per-generation worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub generation: u64,
    pub command: Vec<String>,
    pub setup_command: Option<String>,
    pub source_dir: PathBuf,
    pub app_dir: PathBuf,
    pub presetup_dir: PathBuf,
    pub skip_setup: bool,
    pub load_to_app_dir: bool,
    /// Snapshot of the supervisor's environment at spawn time.
    pub env: Environment,
    pub timing: LifecycleTiming,
}

impl WorkerConfig {
    pub fn new(
        server: &ServerConfig,
        generation: u64,
        env: Environment,
        options: RefreshOptions,
    ) -> Self {
        Self {
            generation,
            command: server.command.clone(),
            setup_command: server.setup_command.clone(),
            source_dir: server.source_dir.clone(),
            app_dir: server.app_dir.clone(),
            presetup_dir: server.presetup_dir.clone(),
            skip_setup: options.skip_setup,
            load_to_app_dir: server.load_to_app_dir,
            env,
            timing: server.timing,
        }
    }

    pub fn plan(&self) -> PipelinePlan {
        PipelinePlan::new(
            self.load_to_app_dir,
            self.skip_setup,
            self.setup_command.is_some(),
        )
    }
}

/// Snapshot of a worker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub generation: u64,
    #[serde(flatten)]
    pub state: WorkerState,
}

/// Cheap, cloneable view on a worker's state.
#[derive(Debug, Clone)]
pub struct WorkerObserver {
    generation: u64,
    state_rx: watch::Receiver<WorkerState>,
}

impl WorkerObserver {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> WorkerState {
        self.state_rx.borrow().clone()
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            generation: self.generation,
            state: self.state(),
        }
    }

    /// Resolve once the worker's state satisfies `f`.
    pub async fn wait_for<F>(&mut self, mut f: F) -> WorkerState
    where
        F: FnMut(&WorkerState) -> bool,
    {
        let reached = self.state_rx.wait_for(|s| f(s)).await.map(|s| s.clone());
        // On error the worker task is gone; report whatever it left behind.
        reached.unwrap_or_else(|_| self.state())
    }
}

/// An application process that outlived its termination budget.
///
/// The worker task hands the child back instead of dropping it, so the
/// process stays owned and can be reaped later.
#[derive(Debug)]
pub struct Unreaped {
    child: Child,
    state_tx: watch::Sender<WorkerState>,
    error: DevServerError,
}

type WorkerTask = JoinHandle<std::result::Result<(), Unreaped>>;

#[derive(Debug)]
enum Lifecycle {
    Active(WorkerTask),
    Unreaped(Child, watch::Sender<WorkerState>),
    Reaped,
}

/// Handle on a worker whose application is running.
///
/// Owned exclusively by the supervisor. It stays owned until [`stop`]
/// succeeds, so an application that could not be killed is never forgotten.
///
/// [`stop`]: WorkerHandle::stop
#[derive(Debug)]
pub struct WorkerHandle {
    observer: WorkerObserver,
    kill: KillSignal,
    pid: u32,
    timing: LifecycleTiming,
    lifecycle: Lifecycle,
}

impl WorkerHandle {
    pub fn generation(&self) -> u64 {
        self.observer.generation
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn observer(&self) -> WorkerObserver {
        self.observer.clone()
    }

    pub fn status(&self) -> WorkerStatus {
        self.observer.status()
    }

    /// The application has been reaped (or the worker task was lost).
    pub fn is_stopped(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Reaped)
    }

    /// Set the kill signal and wait until the application is reaped.
    ///
    /// On [`DevServerError::TerminationExhausted`] the handle keeps the live
    /// process; calling `stop` again runs another round of termination
    /// attempts. Once `stop` has succeeded further calls return `Ok`.
    pub async fn stop(&mut self) -> Result<()> {
        let generation = self.generation();
        self.kill.set();

        match &mut self.lifecycle {
            Lifecycle::Reaped => Ok(()),
            Lifecycle::Active(task) => {
                let joined = task.await;
                match joined {
                    Ok(Ok(())) => {
                        self.lifecycle = Lifecycle::Reaped;
                        Ok(())
                    }
                    Ok(Err(unreaped)) => {
                        let Unreaped {
                            child,
                            state_tx,
                            error,
                        } = unreaped;
                        self.lifecycle = Lifecycle::Unreaped(child, state_tx);
                        Err(error)
                    }
                    Err(join_err) => {
                        self.lifecycle = Lifecycle::Reaped;
                        Err(DevServerError::WorkerLost {
                            generation,
                            reason: join_err.to_string(),
                        })
                    }
                }
            }
            Lifecycle::Unreaped(child, state_tx) => {
                warn!(generation, pid = self.pid, "retrying termination of application");
                terminate(
                    child,
                    self.timing.kill_retry_interval,
                    self.timing.kill_max_attempts,
                )
                .await?;
                state_tx.send_replace(WorkerState::Terminated);
                info!(generation, pid = self.pid, "worker terminated");
                self.lifecycle = Lifecycle::Reaped;
                Ok(())
            }
        }
    }
}

/// A worker that has been spawned but has not yet reported whether its
/// application is running.
#[derive(Debug)]
pub struct PendingWorker {
    observer: WorkerObserver,
    kill: KillSignal,
    timing: LifecycleTiming,
    ready_rx: oneshot::Receiver<Result<u32>>,
    task: WorkerTask,
}

impl PendingWorker {
    pub fn observer(&self) -> WorkerObserver {
        self.observer.clone()
    }

    /// Wait for the setup pipeline to finish.
    ///
    /// `Ok` once the application runs; the pipeline's error if the worker
    /// aborted or the application could not be spawned. In the error case
    /// the worker task has already finished.
    pub async fn wait_ready(self) -> Result<WorkerHandle> {
        let generation = self.observer.generation;
        match self.ready_rx.await {
            Ok(Ok(pid)) => Ok(WorkerHandle {
                observer: self.observer,
                kill: self.kill,
                pid,
                timing: self.timing,
                lifecycle: Lifecycle::Active(self.task),
            }),
            Ok(Err(e)) => {
                let _ = self.task.await;
                Err(e)
            }
            Err(_) => {
                let reason = match self.task.await {
                    Err(join_err) => join_err.to_string(),
                    Ok(Err(unreaped)) => unreaped.error.to_string(),
                    Ok(Ok(())) => "worker ended without reporting readiness".to_string(),
                };
                Err(DevServerError::WorkerLost { generation, reason })
            }
        }
    }
}

/// Spawn a worker task for `config`.
///
/// Returns immediately; use [`PendingWorker::wait_ready`] to learn how the
/// setup pipeline went.
pub fn spawn_worker(config: WorkerConfig, runner: Arc<dyn CommandRunner>) -> PendingWorker {
    let generation = config.generation;
    let timing = config.timing;
    let (kill, kill_watch) = kill_signal();
    let (state_tx, state_rx) = watch::channel(WorkerState::Initializing);
    let (ready_tx, ready_rx) = oneshot::channel();

    let task = tokio::spawn(run_worker(config, runner, kill_watch, state_tx, ready_tx));

    PendingWorker {
        observer: WorkerObserver {
            generation,
            state_rx,
        },
        kill,
        timing,
        ready_rx,
        task,
    }
}

async fn run_worker(
    config: WorkerConfig,
    runner: Arc<dyn CommandRunner>,
    mut kill: KillWatch,
    state_tx: watch::Sender<WorkerState>,
    ready_tx: oneshot::Sender<Result<u32>>,
) -> std::result::Result<(), Unreaped> {
    let generation = config.generation;
    info!(generation, command = ?config.command, "worker starting");

    let pipeline = SetupPipeline::new(&config, runner.as_ref(), &state_tx);
    let launched = match pipeline.run().await {
        Ok(()) => spawn_application(&config.command, &config.app_dir, &config.env),
        Err(e) => Err(e),
    };

    let mut child = match launched {
        Ok(child) => child,
        Err(e) => {
            error!(generation, error = %e, "worker aborted; application not started");
            state_tx.send_replace(WorkerState::Aborted {
                reason: e.to_string(),
            });
            let _ = ready_tx.send(Err(e));
            return Ok(());
        }
    };

    let pid = child.id().unwrap_or_default();
    state_tx.send_replace(WorkerState::Running { pid });
    info!(generation, pid, "application started");
    let _ = ready_tx.send(Ok(pid));

    let interval = config.timing.signal_poll_interval;
    let mut exited = false;
    loop {
        if exited {
            if kill.wait_timeout(interval).await {
                break;
            }
            continue;
        }

        tokio::select! {
            set = kill.wait_timeout(interval) => {
                if set {
                    break;
                }
            }
            status = child.wait() => {
                exited = true;
                let code = match status {
                    Ok(status) => status.code(),
                    Err(e) => {
                        warn!(generation, pid, error = %e, "failed waiting on application");
                        None
                    }
                };
                warn!(generation, pid, ?code, "application exited on its own");
                state_tx.send_replace(WorkerState::Exited { code });
            }
        }
    }

    info!(generation, pid, "received kill signal");
    state_tx.send_replace(WorkerState::Terminating);

    let terminated = terminate(
        &mut child,
        config.timing.kill_retry_interval,
        config.timing.kill_max_attempts,
    )
    .await;

    match terminated {
        Ok(_) => {
            state_tx.send_replace(WorkerState::Terminated);
            info!(generation, pid, "worker terminated");
            Ok(())
        }
        Err(error) => {
            error!(generation, pid, error = %error, "application survived termination");
            Err(Unreaped {
                child,
                state_tx,
                error,
            })
        }
    }
}
