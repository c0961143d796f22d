// src/exec/mod.rs

//! External executor layer.
//!
//! Every step body runs through an [`Executor`]: an abstraction over one
//! backend that runs a single command and reports exit status plus captured
//! output. The engine never assumes a uniform execution substrate; it only
//! assumes every backend honours the `invoke` contract and is safe to
//! re-invoke with the same spec.
//!
//! - [`command`] defines the invocation spec and shared process plumbing.
//! - [`local`] runs commands directly in the current environment.
//! - [`batch`] submits commands synchronously through a queue client.
//! - [`container`] runs commands inside an isolated container.
//! - [`retry`] provides the bounded retry wrapper around `invoke`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::model::ExecutorsSection;
use crate::errors::Result;
use crate::types::ExecutorKind;

pub mod batch;
pub mod command;
pub mod container;
pub mod local;
pub mod retry;

pub use batch::BatchQueueExecutor;
pub use command::{CommandSpec, InvokeOutcome};
pub use container::{ContainerExecutor, VolumeMapping};
pub use local::LocalProcessExecutor;
pub use retry::{invoke_with_retry, RetryPolicy};

/// Trait abstracting how one external command is run.
///
/// Implementations block (asynchronously) until the backend reports
/// completion. A non-zero exit is an `Ok` outcome that callers treat as
/// authoritative failure; `Err` is reserved for invocation-level problems
/// (binary not found, IO failures).
pub trait Executor: Send + Sync {
    fn invoke(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<InvokeOutcome>> + Send + '_>>;
}

/// The per-backend executors available to a run, selected per step.
#[derive(Clone)]
pub struct ExecutorSet {
    local: Arc<dyn Executor>,
    batch: Arc<dyn Executor>,
    container: Arc<dyn Executor>,
}

impl ExecutorSet {
    pub fn new(
        local: Arc<dyn Executor>,
        batch: Arc<dyn Executor>,
        container: Arc<dyn Executor>,
    ) -> Self {
        Self {
            local,
            batch,
            container,
        }
    }

    /// Build the production set from config.
    pub fn from_config(cfg: &ExecutorsSection) -> Result<Self> {
        Ok(Self {
            local: Arc::new(LocalProcessExecutor::new()),
            batch: Arc::new(BatchQueueExecutor::from_config(&cfg.batch)),
            container: Arc::new(ContainerExecutor::from_config(&cfg.container)?),
        })
    }

    /// Same backend for every kind (test setups).
    pub fn uniform(executor: Arc<dyn Executor>) -> Self {
        Self {
            local: executor.clone(),
            batch: executor.clone(),
            container: executor,
        }
    }

    pub fn for_kind(&self, kind: ExecutorKind) -> Arc<dyn Executor> {
        match kind {
            ExecutorKind::Local => self.local.clone(),
            ExecutorKind::Batch => self.batch.clone(),
            ExecutorKind::Container => self.container.clone(),
        }
    }
}
