// src/supervisor.rs

//! The supervisor owns the current worker and the environment handed to new
//! workers.
//!
//! Invariant: at most one worker has a live application process. `refresh`
//! only spawns the replacement after the predecessor's process has been
//! reaped, so the application can bind the same port again.
//!
//! Lifecycle operations run on their own Tokio task. Callers await that task,
//! but dropping the caller (an HTTP client hanging up) never interrupts a
//! retire-then-start sequence halfway.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::errors::{DevServerError, Result};
use crate::exec::command::CommandRunner;
use crate::types::{Environment, RefreshOptions, merge_environment};
use crate::worker::{WorkerConfig, WorkerHandle, WorkerObserver, WorkerState, spawn_worker};

/// What `GET /status` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorStatus {
    /// Generation of the most recently spawned worker (0 before the first).
    pub generation: u64,
    /// Number of refreshes requested so far.
    pub refreshes: u64,
    /// State of the most recent worker, if any was ever spawned.
    pub worker: Option<WorkerState>,
}

pub struct Supervisor {
    shared: Arc<Shared>,
}

struct Shared {
    config: ServerConfig,
    runner: Arc<dyn CommandRunner>,
    env: RwLock<Environment>,
    /// Held for the whole retire-then-start sequence, which serialises
    /// concurrent refreshes. A worker leaves this slot only once its
    /// application has been reaped.
    current: tokio::sync::Mutex<Option<WorkerHandle>>,
    /// Latest spawned worker, readable without waiting on `current`.
    latest: Mutex<Option<WorkerObserver>>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.shared.config)
            .field("generation", &self.shared.generation)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Create a supervisor whose environment is a copy of this process's
    /// environment.
    pub fn new(config: ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_environment(config, runner, std::env::vars().collect())
    }

    pub fn with_environment(
        config: ServerConfig,
        runner: Arc<dyn CommandRunner>,
        env: Environment,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                runner,
                env: RwLock::new(env),
                current: tokio::sync::Mutex::new(None),
                latest: Mutex::new(None),
                generation: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Copy of the current environment.
    pub fn environment(&self) -> Environment {
        self.shared.environment()
    }

    pub fn status(&self) -> SupervisorStatus {
        let shared = &self.shared;
        let worker = shared
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(WorkerObserver::state);
        SupervisorStatus {
            generation: shared.generation.load(Ordering::SeqCst),
            refreshes: shared.refreshes.load(Ordering::SeqCst),
            worker,
        }
    }

    /// Observer for the most recently spawned worker.
    pub fn latest_worker(&self) -> Option<WorkerObserver> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Spawn the first worker.
    ///
    /// Waits for the setup pipeline and returns its error if the worker
    /// aborted. Fails with [`DevServerError::WorkerAlreadyRunning`] when a
    /// worker is already current; use [`Supervisor::refresh`] to replace it.
    pub async fn start(&self, options: RefreshOptions) -> Result<u64> {
        self.detached(move |shared| async move { shared.start(options).await })
            .await
    }

    /// Retire the current worker (if any) and start a replacement.
    ///
    /// Blocks until the old application process is reaped. With no current
    /// worker this is a plain start. Returns the new worker's generation.
    ///
    /// If the old application cannot be reaped the error is returned, the
    /// old worker stays current and nothing new is started.
    pub async fn refresh(&self, options: RefreshOptions) -> Result<u64> {
        self.detached(move |shared| async move { shared.refresh(options).await })
            .await
    }

    /// Merge `diff` into the environment, then refresh.
    ///
    /// The merge sticks even if the refresh fails. Returns the merged
    /// environment.
    pub async fn append_environment(
        &self,
        diff: Environment,
        options: RefreshOptions,
    ) -> Result<Environment> {
        {
            let mut env = self
                .shared
                .env
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            debug!(keys = ?diff.keys().collect::<Vec<_>>(), "appending environment");
            merge_environment(&mut env, diff);
        }
        self.refresh(options).await?;
        Ok(self.environment())
    }

    /// Stop the current worker, if any. Used when the daemon exits.
    pub async fn shutdown(&self) -> Result<()> {
        self.detached(|shared| async move { shared.shutdown().await })
            .await
    }

    async fn detached<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<Shared>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::spawn(op(Arc::clone(&self.shared)));
        match task.await {
            Ok(result) => result,
            Err(join_err) => Err(DevServerError::Other(anyhow::anyhow!(
                "supervisor task failed: {join_err}"
            ))),
        }
    }
}

impl Shared {
    fn environment(&self) -> Environment {
        self.env
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn start(&self, options: RefreshOptions) -> Result<u64> {
        let mut current = self.current.lock().await;
        if let Some(existing) = current.as_ref() {
            return Err(DevServerError::WorkerAlreadyRunning {
                generation: existing.generation(),
            });
        }
        self.start_locked(&mut current, options).await
    }

    async fn refresh(&self, options: RefreshOptions) -> Result<u64> {
        let mut current = self.current.lock().await;
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        match current.as_mut() {
            Some(worker) => {
                info!(generation = worker.generation(), "refreshing: stopping current worker");
                if let Err(e) = worker.stop().await {
                    warn!(
                        generation = worker.generation(),
                        pid = worker.pid(),
                        error = %e,
                        "current worker could not be stopped; not starting a replacement"
                    );
                    return Err(e);
                }
                *current = None;
            }
            None => debug!("refreshing with no current worker; starting fresh"),
        }

        self.start_locked(&mut current, options).await
    }

    async fn shutdown(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        if let Some(worker) = current.as_mut() {
            info!(generation = worker.generation(), "shutting down current worker");
            worker.stop().await?;
            *current = None;
        }
        Ok(())
    }

    async fn start_locked(
        &self,
        current: &mut Option<WorkerHandle>,
        options: RefreshOptions,
    ) -> Result<u64> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let config = WorkerConfig::new(&self.config, generation, self.environment(), options);

        info!(generation, skip_setup = options.skip_setup, "spawning worker");
        let pending = spawn_worker(config, Arc::clone(&self.runner));
        *self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pending.observer());

        let handle = pending.wait_ready().await?;
        info!(generation, pid = handle.pid(), "worker running");
        *current = Some(handle);
        Ok(generation)
    }
}
