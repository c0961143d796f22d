use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fanflow::errors::{FanflowError, Result};
use fanflow::exec::{CommandSpec, Executor, InvokeOutcome};

/// Scripted response for invocations whose argv matches a substring rule.
#[derive(Debug, Clone)]
enum Scripted {
    Fail { exit_code: i32 },
    NotFound,
}

/// A fake executor that:
/// - records every `CommandSpec` it is handed
/// - immediately succeeds unless a scripted rule matches
/// - can delay individual invocations to scramble completion order
/// - tracks the high-water mark of concurrent invocations
#[derive(Clone, Default)]
pub struct FakeExecutor {
    invocations: Arc<Mutex<Vec<CommandSpec>>>,
    rules: Arc<Mutex<Vec<(String, Scripted)>>>,
    delays: Arc<Mutex<Vec<(String, Duration)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail (with the given exit code) any invocation whose argv contains
    /// `needle`.
    pub fn fail_when(self, needle: &str, exit_code: i32) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), Scripted::Fail { exit_code }));
        self
    }

    /// Report the executor binary missing for matching invocations.
    pub fn not_found_when(self, needle: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), Scripted::NotFound));
        self
    }

    /// Sleep before completing matching invocations.
    pub fn delay_when(self, needle: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().push((needle.to_string(), delay));
        self
    }

    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().unwrap().clone()
    }

    /// Argv lines (program + args joined) of every recorded invocation, in
    /// start order.
    pub fn invocation_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|spec| spec.display_line())
            .collect()
    }

    pub fn max_observed_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Executor for FakeExecutor {
    fn invoke(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<InvokeOutcome>> + Send + '_>> {
        let line = spec.display_line();
        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle))
            .map(|(_, delay)| *delay);
        let scripted = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle))
            .map(|(_, scripted)| scripted.clone());

        self.invocations.lock().unwrap().push(spec.clone());

        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();

        Box::pin(async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            in_flight.fetch_sub(1, Ordering::SeqCst);

            match scripted {
                Some(Scripted::Fail { exit_code }) => Ok(InvokeOutcome {
                    exit_code,
                    stdout: String::new(),
                    stderr: format!("scripted failure for {line}"),
                }),
                Some(Scripted::NotFound) => Err(FanflowError::ExecutorNotFound {
                    program: spec.program.clone(),
                }),
                None => Ok(InvokeOutcome {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                }),
            }
        })
    }
}
