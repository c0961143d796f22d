// src/graph.rs

//! Static pipeline definition: an ordered list of step nodes.
//!
//! The graph carries no per-run state; the engine threads the run context
//! and the current artifact through it during traversal.

use crate::config::model::ConfigFile;
use crate::types::{ExecutorKind, StepKind};

/// External command attached to a step (absent for a foreach-source, which
/// resolves the input pattern itself).
#[derive(Debug, Clone)]
pub struct StepCommand {
    pub executor: ExecutorKind,
    pub program: String,
    pub args: Vec<String>,
}

/// One node of the pipeline.
#[derive(Debug, Clone)]
pub struct StepNode {
    pub name: String,
    pub kind: StepKind,
    pub command: Option<StepCommand>,
}

/// Ordered step nodes; `[[step]]` order is execution order.
#[derive(Debug, Clone)]
pub struct StepGraph {
    nodes: Vec<StepNode>,
}

impl StepGraph {
    /// Project a validated config into the static graph.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let nodes = cfg
            .step
            .iter()
            .map(|step| {
                let command = step.command.as_ref().and_then(|argv| {
                    let (program, args) = argv.split_first()?;
                    Some(StepCommand {
                        executor: step.executor.unwrap_or_default(),
                        program: program.clone(),
                        args: args.to_vec(),
                    })
                });
                StepNode {
                    name: step.name.clone(),
                    kind: step.kind,
                    command,
                }
            })
            .collect();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[StepNode] {
        &self.nodes
    }
}
