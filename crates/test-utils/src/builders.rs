#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use jobloop::config::{JobConfig, Manifest, RawManifest, SchedulerSection, UnitKind};
use jobloop::types::AdmissionPolicy;

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                scheduler: SchedulerSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.manifest.job.insert(name.to_string(), job);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.manifest.scheduler.pool_size = pool_size;
        self
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.manifest.scheduler.admission = admission;
        self
    }

    pub fn with_checkpoint(mut self, path: &str) -> Self {
        self.manifest.scheduler.checkpoint = PathBuf::from(path);
        self
    }

    /// The raw manifest, for tests exercising validation failures.
    pub fn raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            job: JobConfig {
                kind,
                dir: None,
                sources: vec![],
                commands: vec![],
                after: vec![],
                tries: 0,
                max_working_time: None,
                start_at: None,
            },
        }
    }

    /// A `command` job running `cmds` in order.
    pub fn command(cmds: &[&str]) -> Self {
        let mut builder = Self::new(UnitKind::Command);
        builder.job.commands = cmds.iter().map(|c| c.to_string()).collect();
        builder
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.job.dir = Some(PathBuf::from(dir));
        self
    }

    pub fn source(mut self, path: &str) -> Self {
        self.job.sources.push(path.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn tries(mut self, tries: i64) -> Self {
        self.job.tries = tries;
        self
    }

    pub fn max_working_time(mut self, secs: f64) -> Self {
        self.job.max_working_time = Some(secs);
        self
    }

    pub fn start_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.start_at = Some(at);
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
