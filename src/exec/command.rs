// src/exec/command.rs

//! Command invocation spec and shared process plumbing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{FanflowError, Result};

/// One external command invocation.
///
/// Everything a backend needs is carried explicitly here: extra environment
/// entries and search-path augmentation are fields of the spec, not ambient
/// process state.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment entries set on the child (e.g. the run tag).
    pub env: Vec<(String, String)>,
    /// Directory prepended to `PATH` when spawning, so alternative clients
    /// (or test doubles) are found first.
    pub path_prepend: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            path_prepend: None,
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn prepend_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path_prepend = Some(dir.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Full argv as one line, for logging and inspection.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of one completed invocation.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl InvokeOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Short failure description for error reporting.
    pub fn failure_detail(&self) -> String {
        let tail = self.stderr.lines().last().unwrap_or("").trim();
        if tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {} ({tail})", self.exit_code)
        }
    }
}

/// Build a `tokio::process::Command` for the given program, applying the
/// spec's environment, search-path and working-directory settings. Output
/// is piped and the child is killed if the invocation future is dropped
/// (e.g. on a run-level abort).
pub(crate) fn base_command(program: &str, spec: &CommandSpec) -> Command {
    let mut cmd = Command::new(program);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    if let Some(dir) = &spec.path_prepend {
        cmd.env("PATH", prepend_search_path(dir));
    }
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn prepend_search_path(dir: &Path) -> std::ffi::OsString {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap_or_else(|_| dir.into())
}

/// Spawn the command and capture its output, mapping a missing binary to
/// the distinct `ExecutorNotFound` error.
pub(crate) async fn run_and_capture(mut cmd: Command, program: &str) -> Result<InvokeOutcome> {
    let output = match cmd.output().await {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(FanflowError::ExecutorNotFound {
                program: program.to_string(),
            });
        }
        Err(err) => {
            let err = anyhow::Error::new(err).context(format!("spawning '{program}'"));
            return Err(FanflowError::Other(err));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stderr.lines() {
        debug!(program = %program, "stderr: {}", line);
    }

    let exit_code = output.status.code().unwrap_or(-1);
    Ok(InvokeOutcome {
        exit_code,
        stdout,
        stderr,
    })
}
