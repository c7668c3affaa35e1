// src/worker/pipeline.rs

//! IO shell around the pure stage ordering in [`super::state`].
//!
//! Failure policy per stage:
//! - `Initializing`, `Loading`, `Setup`: any error aborts the worker.
//! - `PreSetup`: errors are logged and the pipeline continues.

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::errors::{DevServerError, Result};
use crate::exec::command::{CommandRunner, CommandSpec};
use crate::exec::presetup::run_presetup_scripts;
use crate::exec::source::load_source_to_app_dir;

use super::WorkerConfig;
use super::state::{PipelinePlan, Stage, WorkerState};

pub struct SetupPipeline<'a> {
    config: &'a WorkerConfig,
    runner: &'a dyn CommandRunner,
    state_tx: &'a watch::Sender<WorkerState>,
}

impl<'a> SetupPipeline<'a> {
    pub fn new(
        config: &'a WorkerConfig,
        runner: &'a dyn CommandRunner,
        state_tx: &'a watch::Sender<WorkerState>,
    ) -> Self {
        Self {
            config,
            runner,
            state_tx,
        }
    }

    pub fn plan(&self) -> PipelinePlan {
        self.config.plan()
    }

    /// Run every stage of the plan. `Ok(())` means the application may be
    /// launched.
    pub async fn run(&self) -> Result<()> {
        let plan = self.plan();
        let mut stage = Some(Stage::first());

        while let Some(current) = stage {
            self.state_tx.send_replace(current.into());
            self.execute(current).await?;
            stage = current.next(&plan);
        }

        Ok(())
    }

    async fn execute(&self, stage: Stage) -> Result<()> {
        let cfg = self.config;
        match stage {
            Stage::Initializing => {
                // create_dir_all tolerates an existing directory.
                tokio::fs::create_dir_all(&cfg.app_dir).await?;
                Ok(())
            }
            Stage::Loading => {
                load_source_to_app_dir(self.runner, &cfg.env, &cfg.source_dir, &cfg.app_dir).await
            }
            Stage::PreSetup => {
                match run_presetup_scripts(self.runner, &cfg.env, &cfg.presetup_dir).await {
                    Ok(report) if !report.failed.is_empty() => {
                        warn!(
                            generation = cfg.generation,
                            failed = ?report.failed,
                            "some presetup scripts failed"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            generation = cfg.generation,
                            dir = ?cfg.presetup_dir,
                            error = %e,
                            "could not read presetup directory; continuing"
                        );
                    }
                }
                Ok(())
            }
            Stage::Setup => self.run_setup().await,
        }
    }

    async fn run_setup(&self) -> Result<()> {
        let cfg = self.config;
        let Some(setup) = cfg.setup_command.as_deref() else {
            return Ok(());
        };

        info!(generation = cfg.generation, command = %setup, "running setup command");
        let output = self
            .runner
            .run(CommandSpec::shell(setup, &cfg.app_dir, cfg.env.clone()))
            .await?;

        if !output.outcome.is_success() {
            error!(
                generation = cfg.generation,
                command = %setup,
                exit_code = output.outcome.code(),
                "setup command failed"
            );
            return Err(DevServerError::SetupFailed {
                command: setup.to_string(),
                code: output.outcome.code(),
            });
        }

        Ok(())
    }
}
