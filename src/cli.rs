// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::AdmissionPolicy;

/// Command-line arguments for `jobloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobloop",
    version,
    about = "Run resumable jobs cooperatively with dependencies, retry budgets and checkpoints.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = "Jobloop.toml")]
    pub config: String,

    /// Restore job state from the checkpoint before running.
    #[arg(long)]
    pub resume: bool,

    /// Override `[scheduler].checkpoint` from the manifest.
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<String>,

    /// Override `[scheduler].admission` ("literal" or "strict").
    #[arg(long, value_name = "POLICY")]
    pub admission: Option<AdmissionPolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBLOOP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print jobs in admission order, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Arguments for running the manifest at `config` with every flag off.
    pub fn for_config(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            resume: false,
            checkpoint: None,
            admission: None,
            log_level: None,
            dry_run: false,
        }
    }
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
