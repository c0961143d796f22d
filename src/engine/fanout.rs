// src/engine/fanout.rs

//! Fan-out/fan-in of the foreach step.
//!
//! Each input item gets its own `BranchContext` and its own Tokio task; the
//! barrier is a wait on an aggregate completion channel, never polling.
//! Every branch runs to completion (success or failure) before the barrier
//! releases; a failed branch never cancels its siblings, only a run-level
//! abort does. Artifacts are collected in input-item order regardless of
//! completion order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::context::{ArtifactRef, BranchContext, RunContext, RUN_ID_ENV};
use crate::errors::{BranchFailure, FanflowError, Result};
use crate::exec::{invoke_with_retry, CommandSpec, Executor, RetryPolicy};
use crate::graph::{StepCommand, StepNode};

/// What one branch reports back through the barrier channel.
#[derive(Debug)]
struct BranchCompletion {
    index: usize,
    item: PathBuf,
    outcome: BranchOutcome,
}

#[derive(Debug)]
enum BranchOutcome {
    Produced(ArtifactRef),
    Failed(String),
    Cancelled,
}

/// Everything a branch task needs besides its own `BranchContext`.
struct BranchJob {
    step_name: String,
    command: StepCommand,
    executor: Arc<dyn Executor>,
    retry: RetryPolicy,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    done_tx: mpsc::Sender<BranchCompletion>,
}

/// Run the foreach body over all items and collect artifacts in item order.
pub(crate) async fn run_branches(
    step: &StepNode,
    executor: Arc<dyn Executor>,
    items: Vec<PathBuf>,
    ctx: &Arc<RunContext>,
    retry: RetryPolicy,
    max_in_flight: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Vec<ArtifactRef>> {
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let Some(command) = step.command.clone() else {
        return Err(FanflowError::Graph(format!(
            "foreach body step '{}' has no command",
            step.name
        )));
    };

    info!(
        run_id = %ctx.run_id(),
        step = %step.name,
        branches = total,
        "fanning out"
    );

    let (done_tx, mut done_rx) = mpsc::channel::<BranchCompletion>(total);
    let limiter = max_in_flight.map(|n| Arc::new(Semaphore::new(n.max(1))));

    for (index, item) in items.into_iter().enumerate() {
        let branch = BranchContext::new(index, item, ctx);
        let job = BranchJob {
            step_name: step.name.clone(),
            command: command.clone(),
            executor: executor.clone(),
            retry,
            limiter: limiter.clone(),
            cancel: cancel.clone(),
            done_tx: done_tx.clone(),
        };
        tokio::spawn(run_branch(job, branch));
    }
    drop(done_tx);

    // Fan-in barrier: exactly one completion per branch, in any order.
    let mut slots: Vec<Option<ArtifactRef>> = vec![None; total];
    let mut failures: Vec<BranchFailure> = Vec::new();
    let mut cancelled = false;

    let mut received = 0;
    while received < total {
        let Some(done) = done_rx.recv().await else {
            return Err(FanflowError::Other(anyhow!(
                "branch completion channel closed after {received} of {total} branches"
            )));
        };
        received += 1;

        match done.outcome {
            BranchOutcome::Produced(artifact) => {
                // Recorded individually even if a sibling later fails the run.
                info!(
                    branch = done.index,
                    item = %done.item.display(),
                    artifact = %artifact.location().display(),
                    "branch artifact produced"
                );
                slots[done.index] = Some(artifact);
            }
            BranchOutcome::Failed(detail) => {
                error!(
                    branch = done.index,
                    item = %done.item.display(),
                    detail = %detail,
                    "branch failed"
                );
                failures.push(BranchFailure {
                    item: done.item,
                    detail,
                });
            }
            BranchOutcome::Cancelled => {
                cancelled = true;
            }
        }
    }

    if cancelled || cancel.is_cancelled() {
        return Err(FanflowError::Cancelled);
    }

    if !failures.is_empty() {
        failures.sort_by(|a, b| a.item.cmp(&b.item));
        return Err(FanflowError::BranchesFailed { failures, total });
    }

    let mut artifacts = Vec::with_capacity(total);
    for (index, slot) in slots.into_iter().enumerate() {
        let artifact = slot.ok_or_else(|| anyhow!("branch {index} completed without an artifact"))?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

async fn run_branch(job: BranchJob, mut branch: BranchContext) {
    let index = branch.index();
    let item = branch.input_item().to_path_buf();

    let outcome = run_branch_inner(&job, &mut branch).await;
    let _ = job
        .done_tx
        .send(BranchCompletion {
            index,
            item,
            outcome,
        })
        .await;
}

async fn run_branch_inner(job: &BranchJob, branch: &mut BranchContext) -> BranchOutcome {
    // Bounded fan-out: hold a permit for the duration of the invocation.
    let _permit = match &job.limiter {
        Some(limiter) => match limiter.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            // The semaphore is only closed on teardown.
            Err(_) => return BranchOutcome::Cancelled,
        },
        None => None,
    };

    if job.cancel.is_cancelled() {
        return BranchOutcome::Cancelled;
    }

    let Some(ctx) = branch.parent() else {
        return BranchOutcome::Failed("run context dropped before branch execution".to_string());
    };

    let output = ctx.branch_output_path(branch.input_item());
    let spec = CommandSpec::new(&job.command.program)
        .args(job.command.args.clone())
        .arg("--input")
        .arg(branch.input_item().display().to_string())
        .arg("--output")
        .arg(output.display().to_string())
        .env(RUN_ID_ENV, ctx.run_id());

    let invoked = tokio::select! {
        _ = job.cancel.cancelled() => return BranchOutcome::Cancelled,
        res = invoke_with_retry(job.executor.as_ref(), &spec, job.retry) => res,
    };

    match invoked {
        Ok(outcome) if outcome.success() => {
            let artifact = ArtifactRef::new(output, format!("{}[{}]", job.step_name, branch.index()));
            branch.record_artifact(artifact.clone());
            BranchOutcome::Produced(artifact)
        }
        Ok(outcome) => BranchOutcome::Failed(outcome.failure_detail()),
        Err(err) => BranchOutcome::Failed(err.to_string()),
    }
}
