use fanflow::config::{
    ConfigFile, ExecutorsSection, PipelineSection, RawConfigFile, StepSection,
};
use fanflow::types::{ExecutorKind, StepKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    raw: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfigFile {
                pipeline: PipelineSection::default(),
                executors: ExecutorsSection::default(),
                step: Vec::new(),
            },
        }
    }

    pub fn input_pattern(mut self, pattern: &str) -> Self {
        self.raw.pipeline.input_pattern = pattern.to_string();
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.raw.pipeline.output_dir = dir.into();
        self
    }

    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.raw.pipeline.max_in_flight = n;
        self
    }

    pub fn retry_attempts(mut self, n: u32) -> Self {
        self.raw.pipeline.retry_attempts = n;
        self
    }

    pub fn queue(mut self, name: &str) -> Self {
        self.raw.executors.batch.queue = name.to_string();
        self
    }

    pub fn image(mut self, image: &str) -> Self {
        self.raw.executors.container.image = image.to_string();
        self
    }

    pub fn with_step(mut self, step: StepSection) -> Self {
        self.raw.step.push(step);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.raw).expect("failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[step]]` entry.
pub struct StepBuilder {
    step: StepSection,
}

impl StepBuilder {
    pub fn source(name: &str) -> Self {
        Self {
            step: StepSection {
                name: name.to_string(),
                kind: StepKind::ForeachSource,
                executor: None,
                command: None,
            },
        }
    }

    pub fn body(name: &str, command: &[&str]) -> Self {
        Self::with_command(name, StepKind::ForeachBody, command)
    }

    pub fn join(name: &str, command: &[&str]) -> Self {
        Self::with_command(name, StepKind::Join, command)
    }

    pub fn plain(name: &str, command: &[&str]) -> Self {
        Self::with_command(name, StepKind::Plain, command)
    }

    fn with_command(name: &str, kind: StepKind, command: &[&str]) -> Self {
        Self {
            step: StepSection {
                name: name.to_string(),
                kind,
                executor: None,
                command: Some(command.iter().map(|s| s.to_string()).collect()),
            },
        }
    }

    pub fn executor(mut self, kind: ExecutorKind) -> Self {
        self.step.executor = Some(kind);
        self
    }

    pub fn build(self) -> StepSection {
        self.step
    }
}

/// The canonical discover → process → combine pipeline used across tests.
pub fn csv_pipeline_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .input_pattern("data/*.csv")
        .output_dir("data")
        .with_step(StepBuilder::source("discover").build())
        .with_step(StepBuilder::body("process", &["python3", "scripts/process.py"]).build())
        .with_step(StepBuilder::join("combine", &["python3", "scripts/combine.py"]).build())
        .build()
}
