// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FanflowError, Result};
use crate::exec::container::VolumeMapping;
use crate::types::{ExecutorKind, StepKind};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FanflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.pipeline,
            raw.executors,
            raw.step,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_step_names(cfg)?;
    validate_step_commands(cfg)?;
    validate_graph_shape(cfg)?;
    validate_executor_sections(cfg)?;
    Ok(())
}

fn ensure_has_steps(cfg: &RawConfigFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(FanflowError::Config(
            "config must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = BTreeSet::new();
    for step in &cfg.step {
        if step.name.trim().is_empty() {
            return Err(FanflowError::Config(
                "step name must not be empty".to_string(),
            ));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(FanflowError::Config(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
    }
    Ok(())
}

fn validate_step_commands(cfg: &RawConfigFile) -> Result<()> {
    for step in &cfg.step {
        if step.kind == StepKind::ForeachSource {
            // The source resolves the input pattern itself; there is no
            // external command to run.
            if step.command.is_some() || step.executor.is_some() {
                return Err(FanflowError::Config(format!(
                    "step '{}' is a foreach-source and takes no command or executor",
                    step.name
                )));
            }
            continue;
        }

        match &step.command {
            None => {
                return Err(FanflowError::Config(format!(
                    "step '{}' has no command",
                    step.name
                )));
            }
            Some(command) if command.is_empty() => {
                return Err(FanflowError::Config(format!(
                    "step '{}' has an empty command",
                    step.name
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Shape rules for the fan-out construct: either no foreach at all (a purely
/// sequential pipeline), or exactly one source immediately followed by one
/// body immediately followed by one join. Single-level fan-out only.
fn validate_graph_shape(cfg: &RawConfigFile) -> Result<()> {
    let positions = |kind: StepKind| -> Vec<usize> {
        cfg.step
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == kind)
            .map(|(i, _)| i)
            .collect()
    };

    let sources = positions(StepKind::ForeachSource);
    let bodies = positions(StepKind::ForeachBody);
    let joins = positions(StepKind::Join);

    if sources.is_empty() && bodies.is_empty() && joins.is_empty() {
        return Ok(());
    }

    let (&[source], &[body], &[join]) = (&sources[..], &bodies[..], &joins[..]) else {
        return Err(FanflowError::Graph(
            "a foreach construct requires exactly one foreach-source, one foreach-body and one join"
                .to_string(),
        ));
    };

    if body != source + 1 {
        return Err(FanflowError::Graph(
            "foreach-body must immediately follow its foreach-source".to_string(),
        ));
    }
    if join != body + 1 {
        return Err(FanflowError::Graph(
            "join must immediately follow the foreach-body".to_string(),
        ));
    }

    if cfg.pipeline.input_pattern.trim().is_empty() {
        return Err(FanflowError::Config(
            "[pipeline].input_pattern must be set when the graph contains a foreach-source"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_executor_sections(cfg: &RawConfigFile) -> Result<()> {
    let uses = |kind: ExecutorKind| cfg.step.iter().any(|s| s.executor == Some(kind));

    if uses(ExecutorKind::Batch) && cfg.executors.batch.queue.trim().is_empty() {
        return Err(FanflowError::Config(
            "[executors.batch].queue must be set when a step uses the batch executor".to_string(),
        ));
    }

    if uses(ExecutorKind::Container) && cfg.executors.container.image.trim().is_empty() {
        return Err(FanflowError::Config(
            "[executors.container].image must be set when a step uses the container executor"
                .to_string(),
        ));
    }

    for raw in &cfg.executors.container.volumes {
        VolumeMapping::parse(raw)?;
    }

    Ok(())
}
