// src/checkpoint.rs

//! Checkpoint records and the checkpoint file.
//!
//! The file is a single JSON object mapping each job id to its four mutable
//! fields:
//!
//! ```json
//! {
//!   "fetch": {
//!     "actual_working_time": 0.25,
//!     "is_done": false,
//!     "is_stopped": false,
//!     "tries": -1
//!   }
//! }
//! ```
//!
//! It is written wholesale on stop and read wholesale on restart; there are
//! no partial updates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{JobloopError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::JobId;

pub const DEFAULT_CHECKPOINT_FILE: &str = "scheduler_info.json";

/// The mutable part of a job, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobState {
    pub actual_working_time: f64,
    pub is_done: bool,
    pub is_stopped: bool,
    pub tries: i64,
}

/// A job's id together with its state; what `Job::dump` returns and what the
/// scheduler keeps for retired jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    #[serde(flatten)]
    pub state: JobState,
}

/// Job id -> state, the checkpoint file's content.
pub type CheckpointMap = BTreeMap<JobId, JobState>;

/// Location of the checkpoint plus the filesystem used to reach it.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Default for CheckpointFile {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FILE, Arc::new(RealFileSystem))
    }
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `map` and overwrite the checkpoint file.
    pub fn write(&self, map: &CheckpointMap) -> Result<()> {
        let body = serde_json::to_string_pretty(map)?;
        self.fs
            .write(&self.path, body.as_bytes())
            .with_context(|| format!("writing checkpoint {:?}", self.path))?;
        info!(path = ?self.path, jobs = map.len(), "checkpoint written");
        Ok(())
    }

    /// Read and parse the checkpoint file.
    ///
    /// Any failure (missing file, invalid JSON, unexpected fields) is a
    /// [`JobloopError::CheckpointLoad`].
    pub fn read(&self) -> Result<CheckpointMap> {
        let load_err = |source: anyhow::Error| JobloopError::CheckpointLoad {
            path: self.path.clone(),
            source,
        };

        let body = self.fs.read_to_string(&self.path).map_err(load_err)?;
        let map: CheckpointMap = serde_json::from_str(&body)
            .context("parsing checkpoint JSON")
            .map_err(load_err)?;

        debug!(path = ?self.path, jobs = map.len(), "checkpoint read");
        Ok(map)
    }
}
