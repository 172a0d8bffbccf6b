// src/unit/collect.rs

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::info;

use super::source::{Source, SourceFetcher};
use super::{read_json_object, write_json_object, ResumableUnit, DATA_FILE};
use crate::fs::FileSystem;

/// Merges forecast documents into `<dir>/data.json`, one source per step.
///
/// Each document is stored under its `geo_object.locality.name`. A source is
/// only dropped from the pending list once it has been merged, so a failed
/// step (unreadable file, non-2xx answer, bad JSON) retries the same source
/// next time.
#[derive(Debug)]
pub struct CollectUnit {
    dir: PathBuf,
    pending: VecDeque<Source>,
    fs: Arc<dyn FileSystem>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
}

impl CollectUnit {
    pub fn new(dir: impl Into<PathBuf>, sources: Vec<Source>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            pending: sources.into(),
            fs,
            fetcher: None,
        }
    }

    /// Fetcher used for URL sources. Without one, a URL source fails its step.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sources that have not been merged yet, in order.
    pub fn pending(&self) -> impl Iterator<Item = &Source> {
        self.pending.iter()
    }

    fn read_source(&self, source: &Source) -> Result<String> {
        match source {
            Source::File(path) => self.fs.read_to_string(path),
            Source::Url(url) => match &self.fetcher {
                Some(fetcher) => fetcher.fetch(url),
                None => bail!("no fetcher configured for URL source {url}"),
            },
        }
    }
}

/// Extract `geo_object.locality.name` from a forecast document.
pub fn locality_name(doc: &Value) -> Option<&str> {
    doc.pointer("/geo_object/locality/name")?.as_str()
}

impl ResumableUnit for CollectUnit {
    fn step(&mut self) -> Result<Option<Value>> {
        let Some(source) = self.pending.front().cloned() else {
            return Ok(None);
        };

        info!(source = %source, "collecting forecast document");
        let body = self.read_source(&source)?;
        let doc: Value = serde_json::from_str(&body)
            .with_context(|| format!("parsing forecast document {source}"))?;
        let city = locality_name(&doc)
            .with_context(|| format!("{source} has no geo_object.locality.name"))?
            .to_string();

        let data_path = self.dir.join(DATA_FILE);
        let mut summary = if self.fs.exists(&data_path) {
            read_json_object(self.fs.as_ref(), &data_path)?
        } else {
            serde_json::Map::new()
        };
        summary.insert(city.clone(), doc);
        write_json_object(self.fs.as_ref(), &data_path, &summary)?;

        self.pending.pop_front();
        info!(source = %source, city = %city, "forecast document collected");
        Ok(Some(json!({ "city": city })))
    }

    fn describe(&self) -> String {
        format!("collect({} pending)", self.pending.len())
    }
}
