// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::context::RunContext;
use crate::engine::{Engine, EngineOptions};
use crate::errors::Result;
use crate::exec::{ExecutorSet, RetryPolicy};
use crate::fs::GlobDiscovery;
use crate::graph::StepGraph;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the step graph
/// - the per-backend executor set
/// - the engine, with Ctrl-C propagated into its cancellation token
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let graph = StepGraph::from_config(&cfg);
    let executors = ExecutorSet::from_config(&cfg.executors)?;
    let discovery = Arc::new(GlobDiscovery::new(config_root_dir(&config_path)));

    let options = EngineOptions {
        max_in_flight: cfg.pipeline.effective_max_in_flight(args.max_in_flight),
        retry: RetryPolicy::new(
            cfg.pipeline.retry_attempts,
            Duration::from_millis(cfg.pipeline.retry_backoff_ms),
        ),
    };

    let engine = Engine::new(executors, discovery, options);

    // Ctrl-C → run-level abort, observed by every in-flight invocation.
    {
        let cancel = engine.cancel_token();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let ctx = Arc::new(RunContext::new(cfg.pipeline.clone(), args.run_id.clone()));
    let report = engine.run(&graph, ctx).await?;

    for failure in &report.observation_failures {
        info!(
            step = %failure.step,
            detail = %failure.detail,
            "post-join step failed (run unaffected)"
        );
    }
    info!(
        run_id = %report.run_id,
        branches = report.branch_count,
        artifact = %report.final_artifact.location().display(),
        "run finished successfully"
    );
    println!(
        "Result available at: {}",
        report.final_artifact.location().display()
    );

    Ok(())
}

/// Figure out a sensible root directory for file discovery.
///
/// - If the config path has a non-empty parent (e.g. "configs/Fanflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Fanflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print the step plan without executing anything.
fn print_dry_run(cfg: &ConfigFile) {
    println!("fanflow dry-run");
    println!("  pipeline.input_pattern = {}", cfg.pipeline.input_pattern);
    println!(
        "  pipeline.output_dir = {}",
        cfg.pipeline.output_dir.display()
    );
    println!("  pipeline.max_in_flight = {}", cfg.pipeline.max_in_flight);
    println!("  pipeline.retry_attempts = {}", cfg.pipeline.retry_attempts);
    println!();

    println!("steps ({}):", cfg.step.len());
    for step in &cfg.step {
        println!("  - {} ({})", step.name, step.kind);
        if let Some(executor) = step.executor {
            println!("      executor: {executor}");
        }
        if let Some(command) = &step.command {
            println!("      command: {}", command.join(" "));
        }
    }

    debug!("dry-run complete (no execution)");
}
