// src/exec/local.rs

//! Local process backend.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::errors::Result;
use crate::exec::command::{base_command, run_and_capture, CommandSpec, InvokeOutcome};
use crate::exec::Executor;

/// Runs the command directly in the current environment and blocks the
/// calling branch until the child terminates. Non-zero exit status is
/// surfaced to the caller, not swallowed.
#[derive(Debug, Clone, Default)]
pub struct LocalProcessExecutor;

impl LocalProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for LocalProcessExecutor {
    fn invoke(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<InvokeOutcome>> + Send + '_>> {
        Box::pin(async move {
            info!(cmd = %spec.display_line(), "running local command");
            let mut cmd = base_command(&spec.program, &spec);
            cmd.args(&spec.args);
            run_and_capture(cmd, &spec.program).await
        })
    }
}
