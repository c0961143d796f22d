// src/config/mod.rs

//! Pipeline configuration.
//!
//! - [`model`] maps the TOML file to Rust structs.
//! - [`loader`] reads a file and hands back a validated [`model::ConfigFile`].
//! - [`validate`] checks the step-graph shape and the executor sections.

pub mod loader;
pub mod model;
pub mod validate;

pub use model::{
    BatchSection, ConfigFile, ContainerSection, ExecutorsSection, PipelineSection, RawConfigFile,
    StepSection,
};
