// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `fanflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fanflow",
    version,
    about = "Run a fan-out/fan-in file pipeline through external executors.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Fanflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Fanflow.toml")]
    pub config: String,

    /// Explicit run identifier used for artifact naming and log
    /// correlation. Generated when omitted.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Override `[pipeline].max_in_flight` (0 = unbounded).
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// Parse + validate, print the step plan, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FANFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
