// src/types.rs

use std::fmt;

use serde::Deserialize;

/// Kind of a pipeline step node.
///
/// - `Plain`: one sequential step.
/// - `ForeachSource`: resolves the input pattern into the foreach item set.
/// - `ForeachBody`: runs once per item, as a parallel branch.
/// - `Join`: fan-in barrier; consumes all branch artifacts at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Plain,
    ForeachSource,
    ForeachBody,
    Join,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepKind::Plain => "plain",
            StepKind::ForeachSource => "foreach-source",
            StepKind::ForeachBody => "foreach-body",
            StepKind::Join => "join",
        };
        f.write_str(s)
    }
}

/// Which executor backend a step runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Local,
    Batch,
    Container,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutorKind::Local => "local",
            ExecutorKind::Batch => "batch",
            ExecutorKind::Container => "container",
        };
        f.write_str(s)
    }
}
