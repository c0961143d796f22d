// src/engine/mod.rs

//! Pipeline execution engine.
//!
//! This module ties together:
//! - sequential traversal of the step graph
//! - fan-out of the foreach step into per-item branches
//! - the fan-in barrier that collects branch artifacts in input order
//! - the pre-join/post-join failure asymmetry
//!
//! Traversal lives in [`runner`]; the fan-out/fan-in machinery in
//! [`fanout`].

use crate::context::ArtifactRef;
use crate::exec::RetryPolicy;

pub mod fanout;
pub mod runner;

pub use runner::Engine;

/// Engine-level options derived from config + CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Maximum branches in flight at once; `None` = unbounded.
    pub max_in_flight: Option<usize>,
    pub retry: RetryPolicy,
}

/// A post-join step failure: reported, never fatal.
#[derive(Debug, Clone)]
pub struct ObservationFailure {
    pub step: String,
    pub detail: String,
}

/// Terminal summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub final_artifact: ArtifactRef,
    pub branch_count: usize,
    /// Post-join steps that failed without failing the run.
    pub observation_failures: Vec<ObservationFailure>,
}
