// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::AdmissionPolicy;

/// Manifest as read from a TOML file, before validation.
///
/// ```toml
/// [scheduler]
/// pool_size = 10
/// checkpoint = "scheduler_info.json"
///
/// [job.init]
/// kind = "init_dir"
/// dir = "results"
///
/// [job.collect]
/// kind = "collect"
/// dir = "results"
/// sources = ["data/moscow.json", "https://example.org/forecast/paris.json"]
/// after = ["init"]
/// tries = 2
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawManifest {
    /// Scheduler settings from `[scheduler]`.
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// All jobs from `[job.<id>]`, keyed by job id.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A manifest that passed validation. Only constructible via
/// `Manifest::try_from(RawManifest)`.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub scheduler: SchedulerSection,
    pub job: BTreeMap<String, JobConfig>,
    order: Vec<String>,
}

impl Manifest {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        job: BTreeMap<String, JobConfig>,
        order: Vec<String>,
    ) -> Self {
        Self {
            scheduler,
            job,
            order,
        }
    }

    /// Job ids in the order they should be admitted: every job comes after
    /// all of its `after` dependencies, ties broken by id.
    pub fn admission_order(&self) -> Vec<String> {
        self.order.clone()
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Capacity of the active queue.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Checkpoint file, relative to the manifest directory.
    #[serde(default = "default_checkpoint")]
    pub checkpoint: PathBuf,

    /// `"literal"` (default) or `"strict"` pool size enforcement.
    #[serde(default)]
    pub admission: AdmissionPolicy,
}

fn default_pool_size() -> usize {
    10
}

fn default_checkpoint() -> PathBuf {
    PathBuf::from(crate::checkpoint::DEFAULT_CHECKPOINT_FILE)
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            checkpoint: default_checkpoint(),
            admission: AdmissionPolicy::default(),
        }
    }
}

/// Which built-in unit a job wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    InitDir,
    Collect,
    Aggregate,
    Command,
}

/// `[job.<id>]` section.
///
/// Unit-specific fields (`dir`, `sources`, `commands`) are optional here and
/// checked per `kind` during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub kind: UnitKind,

    /// Results directory for `init_dir`, `collect` and `aggregate`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Forecast documents merged by `collect`: paths relative to the
    /// manifest, or `http://` / `https://` URLs.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Shell commands run by `command`, one per step.
    #[serde(default)]
    pub commands: Vec<String>,

    /// Jobs that must finish before this one may step.
    #[serde(default)]
    pub after: Vec<String>,

    /// Retry budget; the job is exhausted once it goes negative.
    #[serde(default)]
    pub tries: i64,

    /// Working-time budget in seconds.
    #[serde(default)]
    pub max_working_time: Option<f64>,

    /// Deferred start, as a quoted RFC 3339 string
    /// (e.g. `start_at = "2026-10-19T12:00:00Z"`).
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
}
