// src/config/validate.rs

use petgraph::algo::toposort;

use crate::config::graph::{admission_order, dependency_graph};
use crate::config::model::{JobConfig, Manifest, RawManifest, UnitKind};
use crate::errors::{JobloopError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = crate::errors::JobloopError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.scheduler, raw.job, order))
    }
}

/// Run every check and return the admission order of the jobs.
fn validate_raw_manifest(cfg: &RawManifest) -> Result<Vec<String>> {
    ensure_has_jobs(cfg)?;
    validate_scheduler(cfg)?;
    for (name, job) in cfg.job.iter() {
        validate_job(name, job)?;
    }
    validate_job_dependencies(cfg)?;
    validate_dag(cfg)
}

fn ensure_has_jobs(cfg: &RawManifest) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(JobloopError::ConfigError(
            "manifest must contain at least one [job.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler(cfg: &RawManifest) -> Result<()> {
    let section = &cfg.scheduler;

    if section.pool_size == 0 {
        return Err(JobloopError::ConfigError(
            "[scheduler].pool_size must be >= 1 (got 0)".to_string(),
        ));
    }

    // Every manifest job is admitted up front, so they all have to fit.
    let capacity = section.admission.capacity(section.pool_size);
    if cfg.job.len() > capacity {
        return Err(JobloopError::ConfigError(format!(
            "{} jobs do not fit into the queue (pool_size = {}, admission = {:?}, capacity = {})",
            cfg.job.len(),
            section.pool_size,
            section.admission,
            capacity
        )));
    }

    if section.checkpoint.as_os_str().is_empty() {
        return Err(JobloopError::ConfigError(
            "[scheduler].checkpoint must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_job(name: &str, job: &JobConfig) -> Result<()> {
    let needs_dir = matches!(
        job.kind,
        UnitKind::InitDir | UnitKind::Collect | UnitKind::Aggregate
    );
    if needs_dir && job.dir.is_none() {
        return Err(JobloopError::ConfigError(format!(
            "job '{}' of kind {:?} requires `dir`",
            name, job.kind
        )));
    }

    if job.kind == UnitKind::Command && job.commands.is_empty() {
        return Err(JobloopError::ConfigError(format!(
            "job '{}' of kind Command requires a non-empty `commands` list",
            name
        )));
    }

    if let Some(max) = job.max_working_time {
        if !max.is_finite() || max < 0.0 {
            return Err(JobloopError::ConfigError(format!(
                "job '{}' has invalid max_working_time {} (expected a non-negative number of seconds)",
                name, max
            )));
        }
    }

    Ok(())
}

fn validate_job_dependencies(cfg: &RawManifest) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            if !cfg.job.contains_key(dep) {
                return Err(JobloopError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(JobloopError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawManifest) -> Result<Vec<String>> {
    let graph = dependency_graph(&cfg.job);

    match toposort(&graph, None) {
        Ok(_) => Ok(admission_order(&graph)),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(JobloopError::DagCycle(format!(
                "cycle detected in job graph involving job '{}'",
                node
            )))
        }
    }
}
