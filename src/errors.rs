// src/errors.rs

//! Crate-wide error type and `Result` alias.

use std::path::PathBuf;

use thiserror::Error;

/// One failed fan-out branch, identified by its input item.
#[derive(Debug, Clone)]
pub struct BranchFailure {
    pub item: PathBuf,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum FanflowError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid step graph: {0}")]
    Graph(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The backend binary itself could not be started. Kept distinct from a
    /// command that started and exited non-zero.
    #[error("executor binary '{program}' not found on the search path")]
    ExecutorNotFound { program: String },

    /// One or more branches failed before the join barrier. The join is
    /// never invoked in this case.
    #[error("{} of {} branch(es) failed", .failures.len(), .total)]
    BranchesFailed {
        failures: Vec<BranchFailure>,
        total: usize,
    },

    #[error("step '{step}' failed: {detail}")]
    StepFailed { step: String, detail: String },

    #[error("join step '{step}' failed: {detail}")]
    JoinFailed { step: String, detail: String },

    /// Run-level abort. Distinct from both success and failure.
    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FanflowError>;
