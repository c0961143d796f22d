// src/exec/retry.rs

//! Bounded retry around `Executor::invoke`.
//!
//! Re-invocation is safe because output paths are deterministic per item
//! and run; an attempt that failed halfway is simply overwritten by the
//! next one. The default policy performs a single attempt.

use std::time::Duration;

use tracing::warn;

use crate::errors::{FanflowError, Result};
use crate::exec::command::{CommandSpec, InvokeOutcome};
use crate::exec::Executor;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Clamped to at least 1.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

/// Invoke with bounded retries.
///
/// Retries non-zero exits and invocation-level IO failures. A missing
/// executor binary is terminal: retrying cannot make it appear.
pub async fn invoke_with_retry(
    executor: &dyn Executor,
    spec: &CommandSpec,
    policy: RetryPolicy,
) -> Result<InvokeOutcome> {
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match executor.invoke(spec.clone()).await {
            Ok(outcome) if outcome.success() => return Ok(outcome),
            Ok(outcome) => {
                if attempt == attempts {
                    return Ok(outcome);
                }
                warn!(
                    cmd = %spec.display_line(),
                    attempt,
                    exit_code = outcome.exit_code,
                    "invocation failed; retrying"
                );
            }
            Err(err @ FanflowError::ExecutorNotFound { .. }) => return Err(err),
            Err(err) => {
                if attempt == attempts {
                    return Err(err);
                }
                warn!(
                    cmd = %spec.display_line(),
                    attempt,
                    error = %err,
                    "invocation error; retrying"
                );
            }
        }
        tokio::time::sleep(policy.backoff).await;
    }

    Err(FanflowError::Other(anyhow::anyhow!(
        "retry loop exhausted without a result"
    )))
}
