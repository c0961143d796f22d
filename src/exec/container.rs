// src/exec/container.rs

//! Container backend.
//!
//! Runs the command inside an isolated container via a docker-compatible
//! CLI:
//!
//! ```text
//! <runtime> run --rm -v <host>:<container>... -w <workdir> -e K=V... <image> <program> <args...>
//! ```
//!
//! Volume mappings are explicit host/container pairs; the pipeline mounts
//! its output directory so artifact paths resolve identically on both
//! sides. "Runtime binary not found" and "command exited non-zero" stay
//! distinct conditions for the caller.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::info;

use crate::config::model::ContainerSection;
use crate::errors::{FanflowError, Result};
use crate::exec::command::{base_command, run_and_capture, CommandSpec, InvokeOutcome};
use crate::exec::Executor;

/// One host-to-container path mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMapping {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl VolumeMapping {
    /// Parse `"host:container"`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(':') {
            Some((host, container)) if !host.is_empty() && !container.is_empty() => Ok(Self {
                host: host.into(),
                container: container.into(),
            }),
            _ => Err(FanflowError::Config(format!(
                "invalid volume mapping '{raw}' (expected host:container)"
            ))),
        }
    }

    fn flag_value(&self) -> String {
        format!("{}:{}", self.host.display(), self.container.display())
    }
}

#[derive(Debug, Clone)]
pub struct ContainerExecutor {
    runtime: String,
    image: String,
    volumes: Vec<VolumeMapping>,
    workdir: Option<String>,
}

impl ContainerExecutor {
    pub fn new(runtime: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            image: image.into(),
            volumes: Vec::new(),
            workdir: None,
        }
    }

    pub fn with_volume(mut self, volume: VolumeMapping) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn with_workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn from_config(cfg: &ContainerSection) -> Result<Self> {
        let mut executor = Self::new(cfg.runtime.clone(), cfg.image.clone());
        for raw in &cfg.volumes {
            executor = executor.with_volume(VolumeMapping::parse(raw)?);
        }
        if let Some(workdir) = &cfg.workdir {
            executor = executor.with_workdir(workdir.clone());
        }
        Ok(executor)
    }

    /// Argv handed to `<runtime>` assembling the isolated run. The spec's
    /// environment entries ride in as `-e` flags.
    fn run_args(&self, spec: &CommandSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        for volume in &self.volumes {
            args.push("-v".to_string());
            args.push(volume.flag_value());
        }
        if let Some(workdir) = &self.workdir {
            args.push("-w".to_string());
            args.push(workdir.clone());
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(self.image.clone());
        args.push(spec.program.clone());
        args.extend(spec.args.iter().cloned());
        args
    }
}

impl Executor for ContainerExecutor {
    fn invoke(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<InvokeOutcome>> + Send + '_>> {
        Box::pin(async move {
            info!(
                runtime = %self.runtime,
                image = %self.image,
                cmd = %spec.display_line(),
                "running containerised command"
            );

            // Env entries go to the containerised process via `-e`; only the
            // search-path augmentation applies to the runtime client itself.
            let mut client_spec = spec.clone();
            client_spec.env = Vec::new();

            let mut cmd = base_command(&self.runtime, &client_spec);
            cmd.args(self.run_args(&spec));
            run_and_capture(cmd, &self.runtime).await
        })
    }
}
