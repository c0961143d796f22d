// src/exec/batch.rs

//! Batch queue backend.
//!
//! Submits the command synchronously through an sbatch-style client:
//!
//! ```text
//! <client> --wait --queue <queue> -- <program> <args...>
//! ```
//!
//! The client binary is itself configuration: `client_path` is prepended to
//! the child's search path so an alternative client (including a test
//! double) is found ahead of any system-wide installation. Submission
//! blocks until the scheduler reports completion; the client's exit status
//! stands in for the job's.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::info;

use crate::config::model::BatchSection;
use crate::errors::Result;
use crate::exec::command::{base_command, run_and_capture, CommandSpec, InvokeOutcome};
use crate::exec::Executor;

#[derive(Debug, Clone)]
pub struct BatchQueueExecutor {
    client: String,
    queue: String,
    client_path: Option<PathBuf>,
}

impl BatchQueueExecutor {
    pub fn new(client: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            queue: queue.into(),
            client_path: None,
        }
    }

    pub fn with_client_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_path = Some(dir.into());
        self
    }

    pub fn from_config(cfg: &BatchSection) -> Self {
        let mut executor = Self::new(cfg.client.clone(), cfg.queue.clone());
        if let Some(dir) = &cfg.client_path {
            executor = executor.with_client_path(dir.clone());
        }
        executor
    }

    /// Submission argv handed to the queue client.
    fn submission_args(&self, spec: &CommandSpec) -> Vec<String> {
        let mut args = vec![
            "--wait".to_string(),
            "--queue".to_string(),
            self.queue.clone(),
            "--".to_string(),
            spec.program.clone(),
        ];
        args.extend(spec.args.iter().cloned());
        args
    }
}

impl Executor for BatchQueueExecutor {
    fn invoke(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<InvokeOutcome>> + Send + '_>> {
        Box::pin(async move {
            info!(
                client = %self.client,
                queue = %self.queue,
                cmd = %spec.display_line(),
                "submitting to batch queue"
            );

            let mut effective = spec.clone();
            if effective.path_prepend.is_none() {
                effective.path_prepend = self.client_path.clone();
            }

            let mut cmd = base_command(&self.client, &effective);
            cmd.args(self.submission_args(&spec));
            run_and_capture(cmd, &self.client).await
        })
    }
}
