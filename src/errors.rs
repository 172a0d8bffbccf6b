// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Job '{0}' is already scheduled")]
    DuplicateJob(String),

    #[error("Job '{job}' depends on unknown job handle #{handle}")]
    UnknownDependency { job: String, handle: usize },

    /// The active queue is at capacity; the job was dropped and the caller
    /// has to try again later.
    #[error("Queue is full (pool_size = {pool_size}); job '{job}' was not scheduled")]
    AdmissionRejected { job: String, pool_size: usize },

    /// Missing or unreadable checkpoint at restart time.
    #[error("Failed to load checkpoint {path:?}: {source}")]
    CheckpointLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobloopError>;
