// src/unit/mod.rs

//! Resumable units: the steppable computations a [`Job`](crate::job::Job)
//! drives one step at a time.
//!
//! - [`ResumableUnit`] is the contract the job layer depends on.
//! - [`IterUnit`] adapts any fallible iterator into a unit.
//! - [`init_dir`], [`collect`], [`aggregate`] and [`command`] are the
//!   built-in units the manifest can refer to by `kind`.
//! - [`source`] resolves collect sources and fetches URL ones over HTTP.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::config::model::{JobConfig, UnitKind};
use crate::errors::JobloopError;
use crate::fs::FileSystem;

pub mod aggregate;
pub mod collect;
pub mod command;
pub mod init_dir;
pub mod source;

pub use aggregate::AggregateUnit;
pub use collect::CollectUnit;
pub use command::CommandUnit;
pub use init_dir::InitDirUnit;
pub use source::{HttpFetcher, Source, SourceFetcher};

/// A computation that makes progress in discrete steps.
///
/// Each call to [`step`](ResumableUnit::step) does one slice of work:
/// - `Ok(Some(value))`: produced a value; the unit can be stepped again.
/// - `Ok(None)`: end of sequence; the unit is permanently exhausted.
/// - `Err(_)`: a transient failure; the caller decides whether to retry.
///
/// Units are constructed once with their arguments and never rebuilt, so
/// any progress (e.g. which source file is next) lives inside the unit.
pub trait ResumableUnit: Send {
    fn step(&mut self) -> Result<Option<Value>>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String {
        "unit".to_string()
    }
}

/// Adapter turning an iterator of `Result<Value>` into a [`ResumableUnit`].
///
/// The iterator running dry is the end-of-sequence signal.
pub struct IterUnit<I> {
    label: String,
    inner: I,
}

impl<I> IterUnit<I>
where
    I: Iterator<Item = Result<Value>> + Send,
{
    pub fn new(label: impl Into<String>, inner: I) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }
}

impl<I> ResumableUnit for IterUnit<I>
where
    I: Iterator<Item = Result<Value>> + Send,
{
    fn step(&mut self) -> Result<Option<Value>> {
        self.inner.next().transpose()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<I> fmt::Debug for IterUnit<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterUnit")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Build the unit a manifest job refers to.
///
/// Relative paths are resolved against `root` (the manifest's directory).
/// Collect jobs with `http(s)://` sources get an [`HttpFetcher`].
/// The manifest has already been validated, so missing per-kind fields are
/// reported as configuration errors rather than panics.
pub fn build_unit(
    name: &str,
    cfg: &JobConfig,
    root: &Path,
    fs: Arc<dyn FileSystem>,
) -> crate::errors::Result<Box<dyn ResumableUnit>> {
    let missing = |field: &str| {
        JobloopError::ConfigError(format!(
            "job '{}' of kind {:?} is missing `{}`",
            name, cfg.kind, field
        ))
    };

    let unit: Box<dyn ResumableUnit> = match cfg.kind {
        UnitKind::InitDir => {
            let dir = cfg.dir.as_ref().ok_or_else(|| missing("dir"))?;
            Box::new(InitDirUnit::new(root.join(dir), fs))
        }
        UnitKind::Collect => {
            let dir = cfg.dir.as_ref().ok_or_else(|| missing("dir"))?;
            let sources = cfg
                .sources
                .iter()
                .map(|s| Source::resolve(s, root))
                .collect::<Vec<_>>();
            let needs_http = sources.iter().any(Source::is_url);
            let mut unit = CollectUnit::new(root.join(dir), sources, fs);
            if needs_http {
                let fetcher = HttpFetcher::new().map_err(|e| {
                    JobloopError::ConfigError(format!("job '{}': {:#}", name, e))
                })?;
                unit = unit.with_fetcher(Arc::new(fetcher));
            }
            Box::new(unit)
        }
        UnitKind::Aggregate => {
            let dir = cfg.dir.as_ref().ok_or_else(|| missing("dir"))?;
            Box::new(AggregateUnit::new(root.join(dir), fs))
        }
        UnitKind::Command => {
            if cfg.commands.is_empty() {
                return Err(missing("commands"));
            }
            Box::new(CommandUnit::new(cfg.commands.clone()).with_working_dir(root))
        }
    };

    Ok(unit)
}

/// File names shared by the collect/aggregate units.
pub(crate) const DATA_FILE: &str = "data.json";
pub(crate) const RESULT_FILE: &str = "result.json";

/// Read a JSON object from `path`, treating an empty file as `{}`.
pub(crate) fn read_json_object(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<serde_json::Map<String, Value>> {
    use anyhow::Context;

    let contents = fs.read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("parsing JSON in {:?}", path))?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object in {:?}, found {}", path, other),
    }
}

pub(crate) fn write_json_object(
    fs: &dyn FileSystem,
    path: &Path,
    map: &serde_json::Map<String, Value>,
) -> Result<()> {
    let body = serde_json::to_string_pretty(map)?;
    fs.write(path, body.as_bytes())
}
