// src/engine/runner.rs

//! Sequential graph traversal.
//!
//! Steps before the join are strict: any failure is fatal to the run.
//! Steps after the join are observational: failures are logged and recorded
//! in the report, and the join artifact stands.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::{ArtifactRef, RunContext, RUN_ID_ENV};
use crate::engine::fanout::run_branches;
use crate::engine::{EngineOptions, ObservationFailure, RunReport};
use crate::errors::{FanflowError, Result};
use crate::exec::{invoke_with_retry, CommandSpec, Executor, ExecutorSet, InvokeOutcome};
use crate::fs::FileDiscovery;
use crate::graph::{StepCommand, StepGraph, StepNode};
use crate::types::StepKind;

/// Drives one pipeline run from the first step to the terminal state.
pub struct Engine {
    executors: ExecutorSet,
    discovery: Arc<dyn FileDiscovery>,
    options: EngineOptions,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        executors: ExecutorSet,
        discovery: Arc<dyn FileDiscovery>,
        options: EngineOptions,
    ) -> Self {
        Self {
            executors,
            discovery,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by every in-flight invocation; cancelling it aborts
    /// the run with the distinct `Cancelled` terminal state.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the graph against the shared run context.
    pub async fn run(&self, graph: &StepGraph, ctx: Arc<RunContext>) -> Result<RunReport> {
        info!(
            run_id = %ctx.run_id(),
            steps = graph.nodes().len(),
            "pipeline run starting"
        );

        let mut current: Option<ArtifactRef> = None;
        let mut pending_items: Option<Vec<PathBuf>> = None;
        let mut branch_artifacts: Option<Vec<ArtifactRef>> = None;
        let mut branch_count = 0;
        let mut past_join = false;
        let mut observation_failures = Vec::new();

        for step in graph.nodes() {
            if self.cancel.is_cancelled() {
                return Err(FanflowError::Cancelled);
            }

            match step.kind {
                StepKind::ForeachSource => {
                    let items = self.discovery.discover(ctx.input_pattern())?;
                    info!(
                        run_id = %ctx.run_id(),
                        step = %step.name,
                        count = items.len(),
                        "discovered foreach inputs"
                    );
                    branch_count = items.len();
                    pending_items = Some(items);
                }
                StepKind::ForeachBody => {
                    let items = pending_items.take().ok_or_else(|| {
                        FanflowError::Graph(format!(
                            "foreach body '{}' has no preceding source",
                            step.name
                        ))
                    })?;
                    let executor = self.executor_for(step)?;
                    let artifacts = run_branches(
                        step,
                        executor,
                        items,
                        &ctx,
                        self.options.retry,
                        self.options.max_in_flight,
                        &self.cancel,
                    )
                    .await?;
                    branch_artifacts = Some(artifacts);
                }
                StepKind::Join => {
                    let artifacts = branch_artifacts.take().unwrap_or_default();
                    current = Some(self.run_join(step, &ctx, &artifacts).await?);
                    past_join = true;
                }
                StepKind::Plain => match self.run_plain(step, &ctx, current.as_ref()).await {
                    Ok(artifact) => {
                        if past_join {
                            // Post-join steps observe the join artifact;
                            // they never replace the pipeline result.
                            info!(
                                run_id = %ctx.run_id(),
                                step = %step.name,
                                artifact = %artifact.location().display(),
                                "post-join step artifact produced"
                            );
                        } else {
                            current = Some(artifact);
                        }
                    }
                    Err(FanflowError::Cancelled) => return Err(FanflowError::Cancelled),
                    Err(err) if past_join => {
                        // Observational side step: the artifact already
                        // produced stays valid.
                        warn!(
                            run_id = %ctx.run_id(),
                            step = %step.name,
                            error = %err,
                            "post-join step failed; run outcome unchanged"
                        );
                        observation_failures.push(ObservationFailure {
                            step: step.name.clone(),
                            detail: err.to_string(),
                        });
                    }
                    Err(err) => return Err(err),
                },
            }
        }

        let final_artifact = current.ok_or_else(|| {
            FanflowError::Graph("pipeline produced no artifact".to_string())
        })?;

        info!(
            run_id = %ctx.run_id(),
            artifact = %final_artifact.location().display(),
            "pipeline run finished"
        );

        Ok(RunReport {
            run_id: ctx.run_id().to_string(),
            final_artifact,
            branch_count,
            observation_failures,
        })
    }

    /// Merge all branch artifacts into one. Runs even with zero branches:
    /// `--inputs` is then followed immediately by `--output`.
    async fn run_join(
        &self,
        step: &StepNode,
        ctx: &RunContext,
        artifacts: &[ArtifactRef],
    ) -> Result<ArtifactRef> {
        let command = Self::step_command(step)?;
        let executor = self.executors.for_kind(command.executor);
        let output = ctx.join_output_path();

        let mut spec = CommandSpec::new(&command.program)
            .args(command.args.clone())
            .arg("--inputs");
        for artifact in artifacts {
            spec = spec.arg(artifact.location().display().to_string());
        }
        spec = spec
            .arg("--output")
            .arg(output.display().to_string())
            .env(RUN_ID_ENV, ctx.run_id());

        info!(
            run_id = %ctx.run_id(),
            step = %step.name,
            inputs = artifacts.len(),
            "joining branch artifacts"
        );

        let outcome = match self.invoke(&executor, &spec).await {
            Ok(outcome) => outcome,
            Err(FanflowError::Cancelled) => return Err(FanflowError::Cancelled),
            Err(err) => {
                return Err(FanflowError::JoinFailed {
                    step: step.name.clone(),
                    detail: err.to_string(),
                });
            }
        };

        if !outcome.success() {
            return Err(FanflowError::JoinFailed {
                step: step.name.clone(),
                detail: outcome.failure_detail(),
            });
        }

        Ok(ArtifactRef::new(output, step.name.clone()))
    }

    async fn run_plain(
        &self,
        step: &StepNode,
        ctx: &RunContext,
        input: Option<&ArtifactRef>,
    ) -> Result<ArtifactRef> {
        let command = Self::step_command(step)?;
        let executor = self.executors.for_kind(command.executor);
        let output = ctx.step_output_path(&step.name);

        let mut spec = CommandSpec::new(&command.program).args(command.args.clone());
        if let Some(artifact) = input {
            spec = spec
                .arg("--input")
                .arg(artifact.location().display().to_string());
        }
        spec = spec
            .arg("--output")
            .arg(output.display().to_string())
            .env(RUN_ID_ENV, ctx.run_id());

        info!(run_id = %ctx.run_id(), step = %step.name, "running step");

        let outcome = self.invoke(&executor, &spec).await?;
        if !outcome.success() {
            return Err(FanflowError::StepFailed {
                step: step.name.clone(),
                detail: outcome.failure_detail(),
            });
        }

        Ok(ArtifactRef::new(output, step.name.clone()))
    }

    async fn invoke(
        &self,
        executor: &Arc<dyn Executor>,
        spec: &CommandSpec,
    ) -> Result<InvokeOutcome> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(FanflowError::Cancelled),
            res = invoke_with_retry(executor.as_ref(), spec, self.options.retry) => res,
        }
    }

    fn executor_for(&self, step: &StepNode) -> Result<Arc<dyn Executor>> {
        let command = Self::step_command(step)?;
        Ok(self.executors.for_kind(command.executor))
    }

    fn step_command(step: &StepNode) -> Result<&StepCommand> {
        step.command.as_ref().ok_or_else(|| {
            FanflowError::Graph(format!("step '{}' has no command", step.name))
        })
    }
}
