// src/lib.rs

pub mod checkpoint;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod job;
pub mod logging;
pub mod types;
pub mod unit;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_from_path;
use crate::config::Manifest;
use crate::engine::{RunReport, Scheduler, StopHandle};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

pub use crate::job::{Job, JobHandle, StepOutcome};
pub use crate::unit::ResumableUnit;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - scheduler construction and job admission
/// - a fresh run, or a restart from the checkpoint with `--resume`
/// - a final `stop()` so the checkpoint reflects where the loop ended
///
/// Blocks until the queue drains or `stop` is raised.
pub fn run(args: CliArgs, stop: StopHandle) -> Result<RunReport> {
    let config_path = PathBuf::from(&args.config);
    let manifest = load_with_overrides(&config_path, &args)?;

    if args.dry_run {
        print_dry_run(&manifest);
        return Ok(RunReport::default());
    }

    let root = config_root_dir(&config_path);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut scheduler = Scheduler::from_manifest(&manifest, &root, fs)?.with_stop_handle(stop);

    let report = if args.resume {
        scheduler.restart()?
    } else {
        scheduler.run()
    };

    scheduler.stop()?;

    info!(
        steps = report.steps,
        retired = report.retired.len(),
        still_queued = scheduler.queue_len(),
        interrupted = report.interrupted,
        "jobloop finished"
    );
    Ok(report)
}

/// Load the manifest, apply the CLI overrides to its `[scheduler]` section,
/// then validate. Overridden values go through the same checks as the file.
fn load_with_overrides(config_path: &Path, args: &CliArgs) -> Result<Manifest> {
    let mut raw = load_from_path(config_path)?;

    if let Some(path) = &args.checkpoint {
        raw.scheduler.checkpoint = PathBuf::from(path);
    }
    if let Some(admission) = args.admission {
        raw.scheduler.admission = admission;
    }

    Manifest::try_from(raw)
}

/// Figure out the directory manifest-relative paths are resolved against.
///
/// - If the manifest path has a non-empty parent (e.g. "jobs/Jobloop.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Jobloop.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: scheduler settings, then jobs in admission order.
fn print_dry_run(manifest: &Manifest) {
    let section = &manifest.scheduler;
    println!("jobloop dry-run");
    println!("  scheduler.pool_size = {}", section.pool_size);
    println!("  scheduler.admission = {:?}", section.admission);
    println!("  scheduler.checkpoint = {}", section.checkpoint.display());
    println!();

    let order = manifest.admission_order();
    println!("jobs ({}), in admission order:", order.len());
    for name in order {
        let Some(job) = manifest.job.get(&name) else {
            continue;
        };
        println!("  - {name}");
        println!("      kind: {:?}", job.kind);
        if let Some(ref dir) = job.dir {
            println!("      dir: {}", dir.display());
        }
        if !job.sources.is_empty() {
            println!("      sources: {:?}", job.sources);
        }
        if !job.commands.is_empty() {
            println!("      commands: {:?}", job.commands);
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
        println!("      tries: {}", job.tries);
        if let Some(max) = job.max_working_time {
            println!("      max_working_time: {max}s");
        }
        if let Some(start_at) = job.start_at {
            println!("      start_at: {}", start_at.to_rfc3339());
        }
    }

    debug!("dry-run complete (no execution)");
}
