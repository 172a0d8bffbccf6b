// src/unit/init_dir.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{write_json_object, ResumableUnit, DATA_FILE, RESULT_FILE};
use crate::fs::FileSystem;

/// Creates the results directory and seeds empty `data.json` and
/// `result.json` objects. Finishes after a single step.
#[derive(Debug)]
pub struct InitDirUnit {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    done: bool,
}

impl InitDirUnit {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
            done: false,
        }
    }
}

impl ResumableUnit for InitDirUnit {
    fn step(&mut self) -> Result<Option<Value>> {
        if self.done {
            return Ok(None);
        }

        if self.fs.is_dir(&self.dir) {
            warn!(dir = ?self.dir, "results directory already exists");
        } else {
            info!(dir = ?self.dir, "creating results directory");
            self.fs.create_dir(&self.dir)?;
        }

        let empty = serde_json::Map::new();
        write_json_object(self.fs.as_ref(), &self.dir.join(DATA_FILE), &empty)?;
        write_json_object(self.fs.as_ref(), &self.dir.join(RESULT_FILE), &empty)?;

        self.done = true;
        info!(dir = ?self.dir, "results directory initialised");
        Ok(Some(json!({ "dir": self.dir.display().to_string() })))
    }

    fn describe(&self) -> String {
        format!("init_dir({})", self.dir.display())
    }
}
