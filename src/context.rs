// src/context.rs

//! Shared run identity and per-branch state.
//!
//! A [`RunContext`] is created once per pipeline execution and shared
//! read-only (via `Arc`) with every branch; it is never mutated after
//! construction, so no locking is involved. Each foreach item gets its own
//! [`BranchContext`], which is owned by exactly one branch task and records
//! at most one produced [`ArtifactRef`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::config::model::PipelineSection;

/// Environment key carrying the run tag into child processes. The engine
/// sets it as an explicit entry on every invocation spec.
pub const RUN_ID_ENV: &str = "FANFLOW_RUN_ID";

/// Configuration and identity shared by all branches of one run.
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    settings: PipelineSection,
}

impl RunContext {
    /// Build the context for one run. An explicit `run_id` wins; otherwise
    /// a fresh random token is generated.
    pub fn new(settings: PipelineSection, run_id: Option<String>) -> Self {
        let run_id = run_id.unwrap_or_else(generate_run_id);
        Self { run_id, settings }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn input_pattern(&self) -> &str {
        &self.settings.input_pattern
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    /// Deterministic per-branch output path:
    /// `<output_dir>/processed_<stem>_<run_id><ext>`.
    ///
    /// Derived from the input item and the run id so two branches, or the
    /// same branch across two runs, never collide. Re-invocation with the
    /// same item and run id yields the same path.
    pub fn branch_output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input");
        let ext = input
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        self.settings
            .output_dir
            .join(format!("processed_{stem}_{}{ext}", self.run_id))
    }

    /// Output path of the join step: `<output_dir>/final_combined_<run_id>.csv`.
    pub fn join_output_path(&self) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("final_combined_{}.csv", self.run_id))
    }

    /// Output path of a plain step: `<output_dir>/<step>_<run_id>`.
    pub fn step_output_path(&self, step: &str) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("{step}_{}", self.run_id))
    }
}

fn generate_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Immutable handle to one unit of pipeline output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    location: PathBuf,
    producer: String,
}

impl ArtifactRef {
    pub fn new(location: impl Into<PathBuf>, producer: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            producer: producer.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }
}

/// Per-branch state: created at fan-out time, moved into its branch task,
/// and dropped once the barrier has collected the branch's result.
#[derive(Debug)]
pub struct BranchContext {
    index: usize,
    input_item: PathBuf,
    output_artifact: Option<ArtifactRef>,
    parent: Weak<RunContext>,
}

impl BranchContext {
    pub fn new(index: usize, input_item: impl Into<PathBuf>, parent: &Arc<RunContext>) -> Self {
        Self {
            index,
            input_item: input_item.into(),
            output_artifact: None,
            parent: Arc::downgrade(parent),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn input_item(&self) -> &Path {
        &self.input_item
    }

    /// Upgrade the back-reference to the owning run. `None` only if the run
    /// context was dropped while the branch is still alive.
    pub fn parent(&self) -> Option<Arc<RunContext>> {
        self.parent.upgrade()
    }

    /// Record the branch's produced artifact. A branch produces at most one.
    pub fn record_artifact(&mut self, artifact: ArtifactRef) {
        debug_assert!(
            self.output_artifact.is_none(),
            "branch artifact assigned twice"
        );
        self.output_artifact = Some(artifact);
    }

    pub fn output_artifact(&self) -> Option<&ArtifactRef> {
        self.output_artifact.as_ref()
    }
}
