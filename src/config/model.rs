// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{ExecutorKind, StepKind};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// input_pattern = "data/student_*.csv"
/// output_dir = "data"
/// max_in_flight = 4
///
/// [executors.batch]
/// client = "sbatch"
/// queue = "short"
///
/// [[step]]
/// name = "discover"
/// kind = "foreach-source"
///
/// [[step]]
/// name = "process"
/// kind = "foreach-body"
/// executor = "local"
/// command = ["python3", "scripts/process.py"]
/// ```
///
/// All sections have defaults; `[[step]]` order is execution order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Run-wide settings from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Backend settings from `[executors.*]`.
    #[serde(default)]
    pub executors: ExecutorsSection,

    /// Ordered steps from `[[step]]`.
    #[serde(default)]
    pub step: Vec<StepSection>,
}

/// Validated configuration. Construct via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub executors: ExecutorsSection,
    pub step: Vec<StepSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        executors: ExecutorsSection,
        step: Vec<StepSection>,
    ) -> Self {
        Self {
            pipeline,
            executors,
            step,
        }
    }
}

/// `[pipeline]` section: settings shared read-only by every branch of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Glob pattern resolved by the foreach-source step.
    #[serde(default)]
    pub input_pattern: String,

    /// Directory receiving every artifact the run produces.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum branches in flight at once; `0` = unbounded.
    #[serde(default)]
    pub max_in_flight: usize,

    /// Invocation attempts per step, including the first. `1` = no retry.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between retry attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            input_pattern: String::new(),
            output_dir: default_output_dir(),
            max_in_flight: 0,
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl PipelineSection {
    /// Effective in-flight bound: a CLI override wins, `0` means unbounded.
    pub fn effective_max_in_flight(&self, cli_override: Option<usize>) -> Option<usize> {
        match cli_override.unwrap_or(self.max_in_flight) {
            0 => None,
            n => Some(n),
        }
    }
}

/// `[executors]` section: per-backend settings. The local backend needs none.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorsSection {
    #[serde(default)]
    pub batch: BatchSection,

    #[serde(default)]
    pub container: ContainerSection,
}

/// `[executors.batch]`: synchronous submission through a queue client.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    /// Queue client binary (sbatch-style; must support `--wait`).
    #[serde(default = "default_batch_client")]
    pub client: String,

    /// Queue / partition jobs are submitted to.
    #[serde(default)]
    pub queue: String,

    /// Directory prepended to `PATH` so the client (or a stand-in for it)
    /// is found ahead of any system-wide installation.
    #[serde(default)]
    pub client_path: Option<PathBuf>,
}

fn default_batch_client() -> String {
    "sbatch".to_string()
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            client: default_batch_client(),
            queue: String::new(),
            client_path: None,
        }
    }
}

/// `[executors.container]`: isolated runs through a docker-compatible CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSection {
    #[serde(default = "default_container_runtime")]
    pub runtime: String,

    /// Image steps run in.
    #[serde(default)]
    pub image: String,

    /// `"host:container"` volume mappings. Mount the output directory so
    /// artifact paths resolve identically on both sides.
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Working directory inside the container.
    #[serde(default)]
    pub workdir: Option<String>,
}

fn default_container_runtime() -> String {
    "docker".to_string()
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            runtime: default_container_runtime(),
            image: String::new(),
            volumes: Vec::new(),
            workdir: None,
        }
    }
}

/// One `[[step]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepSection {
    pub name: String,

    /// `plain`, `foreach-source`, `foreach-body` or `join`.
    pub kind: StepKind,

    /// Backend this step runs through; defaults to `local`.
    /// A foreach-source takes none.
    #[serde(default)]
    pub executor: Option<ExecutorKind>,

    /// Program plus fixed arguments. The engine appends the
    /// `--input`/`--inputs`/`--output` contract arguments per step kind.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}
