// src/engine/scheduler.rs

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointFile, CheckpointMap, JobRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::Manifest;
use crate::engine::report::{RunReport, Tick};
use crate::engine::stop_handle::StopHandle;
use crate::errors::{JobloopError, Result};
use crate::fs::FileSystem;
use crate::job::{ArenaView, Job, JobHandle};
use crate::types::AdmissionPolicy;
use crate::unit::build_unit;

/// Scheduler owns every admitted job plus the queue/retired bookkeeping.
///
/// It is responsible for:
/// - admission control against `pool_size`
/// - the FIFO run loop with round-robin requeue
/// - moving finished jobs to the retired list
/// - writing and reading the checkpoint file
///
/// Jobs live in an arena for the scheduler's whole lifetime; the queue holds
/// handles into it. A retired job stays in the arena (dependents keep
/// reading its `is_done`) but never re-enters the queue.
#[derive(Debug)]
pub struct Scheduler {
    pool_size: usize,
    admission: AdmissionPolicy,
    jobs: Vec<Job>,
    queue: VecDeque<JobHandle>,
    ended: Vec<JobRecord>,
    has_stopped: bool,
    checkpoint: CheckpointFile,
    clock: Arc<dyn Clock>,
    stop_handle: StopHandle,
}

impl Scheduler {
    /// Scheduler with literal admission, the system clock and
    /// `scheduler_info.json` in the working directory.
    pub fn new(pool_size: usize) -> Self {
        info!(pool_size, "scheduler created");
        Self {
            pool_size,
            admission: AdmissionPolicy::default(),
            jobs: Vec::new(),
            queue: VecDeque::new(),
            ended: Vec::new(),
            has_stopped: false,
            checkpoint: CheckpointFile::default(),
            clock: Arc::new(SystemClock),
            stop_handle: StopHandle::new(),
        }
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointFile) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_stop_handle(mut self, stop_handle: StopHandle) -> Self {
        self.stop_handle = stop_handle;
        self
    }

    /// Build a scheduler from a validated [`Manifest`] and admit all of its
    /// jobs in dependency order.
    ///
    /// Relative paths (checkpoint, unit directories) are resolved against
    /// `root`.
    pub fn from_manifest(manifest: &Manifest, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let section = &manifest.scheduler;
        let checkpoint = CheckpointFile::new(root.join(&section.checkpoint), Arc::clone(&fs));

        let mut scheduler = Scheduler::new(section.pool_size)
            .with_admission(section.admission)
            .with_checkpoint(checkpoint);

        let mut handles: HashMap<String, JobHandle> = HashMap::new();

        for name in manifest.admission_order() {
            let cfg = manifest.job.get(&name).ok_or_else(|| {
                JobloopError::ConfigError(format!("job '{}' vanished from manifest", name))
            })?;

            let unit = build_unit(&name, cfg, root, Arc::clone(&fs))?;
            let mut job = Job::new(name.clone(), unit).with_tries(cfg.tries);
            if let Some(max) = cfg.max_working_time {
                job = job.with_max_working_time(max);
            }
            if let Some(start_at) = cfg.start_at {
                job = job.with_start_at(start_at);
            }
            for dep in cfg.after.iter() {
                let handle = handles.get(dep).copied().ok_or_else(|| {
                    JobloopError::ConfigError(format!(
                        "job '{}' depends on '{}', which was not admitted before it",
                        name, dep
                    ))
                })?;
                job = job.depends_on(handle);
            }

            let handle = scheduler.schedule(job)?;
            handles.insert(name, handle);
        }

        Ok(scheduler)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn admission(&self) -> AdmissionPolicy {
        self.admission
    }

    /// Whether `stop` was called and no `restart` followed yet.
    pub fn is_stopped(&self) -> bool {
        self.has_stopped
    }

    pub fn checkpoint(&self) -> &CheckpointFile {
        &self.checkpoint
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    pub fn job(&self, handle: JobHandle) -> Option<&Job> {
        self.jobs.get(handle.index())
    }

    pub fn handle_of(&self, id: &str) -> Option<JobHandle> {
        self.jobs
            .iter()
            .position(|job| job.id() == id)
            .map(JobHandle::new)
    }

    /// Ids of the active jobs, head of the queue first.
    pub fn queued_ids(&self) -> Vec<&str> {
        self.queue
            .iter()
            .filter_map(|&handle| self.job(handle))
            .map(Job::id)
            .collect()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Checkpoint records of retired jobs, in retirement order.
    pub fn ended(&self) -> &[JobRecord] {
        &self.ended
    }

    /// Set a job's pause flag. Only queued jobs can be paused: an unknown
    /// handle or a job that already retired returns `false` and changes
    /// nothing, so the retired record in the checkpoint stays accurate.
    pub fn pause(&mut self, handle: JobHandle) -> bool {
        if !self.queue.contains(&handle) {
            warn!(handle = handle.index(), "pause ignored: job is not in the queue");
            return false;
        }
        match self.jobs.get_mut(handle.index()) {
            Some(job) => {
                job.pause();
                true
            }
            None => false,
        }
    }

    /// Admit a job at the tail of the queue.
    ///
    /// Rejected jobs are dropped; the caller has to build and schedule them
    /// again. Dependencies must be handles returned by earlier calls on this
    /// scheduler, which also rules out dependency cycles.
    pub fn schedule(&mut self, job: Job) -> Result<JobHandle> {
        let capacity = self.admission.capacity(self.pool_size);
        if self.queue.len() >= capacity {
            warn!(
                job = %job.id(),
                queued = self.queue.len(),
                pool_size = self.pool_size,
                "cannot schedule job: queue is full"
            );
            return Err(JobloopError::AdmissionRejected {
                job: job.id().to_string(),
                pool_size: self.pool_size,
            });
        }

        if self.jobs.iter().any(|existing| existing.id() == job.id()) {
            warn!(job = %job.id(), "cannot schedule job: id already in use");
            return Err(JobloopError::DuplicateJob(job.id().to_string()));
        }

        if let Some(&unknown) = job
            .depends()
            .iter()
            .find(|handle| handle.index() >= self.jobs.len())
        {
            warn!(job = %job.id(), dependency = %unknown, "cannot schedule job: unknown dependency");
            return Err(JobloopError::UnknownDependency {
                job: job.id().to_string(),
                handle: unknown.index(),
            });
        }

        let handle = JobHandle::new(self.jobs.len());
        info!(
            job = %job.id(),
            %handle,
            tries = job.tries(),
            max_working_time = ?job.max_working_time(),
            start_at = ?job.start_at(),
            depends = job.depends().len(),
            "job scheduled"
        );
        self.jobs.push(job);
        self.queue.push_back(handle);
        Ok(handle)
    }

    /// Run one loop iteration: pop the head job, step it, then requeue or
    /// retire it.
    ///
    /// Returns `None` when the queue is empty or the scheduler is stopped.
    pub fn step_once(&mut self) -> Option<Tick> {
        if self.has_stopped {
            warn!("scheduler is stopped; restart it before stepping");
            return None;
        }

        let handle = self.queue.pop_front()?;
        let (before, rest) = self.jobs.split_at_mut(handle.index());
        let (job, after) = rest.split_first_mut()?;

        let view = ArenaView::new(before, after);
        let outcome = job.step(self.clock.as_ref(), &view);

        // Re-check the flag as well: a unit may have left the job done
        // without a terminal outcome.
        let retired = outcome.is_terminal() || job.is_done();
        if retired {
            let record = job.dump();
            info!(
                job = %record.id,
                tries = record.state.tries,
                actual_working_time = record.state.actual_working_time,
                "job retired"
            );
            self.ended.push(record);
        } else {
            self.queue.push_back(handle);
        }

        Some(Tick {
            handle,
            job: job.id().to_string(),
            outcome,
            retired,
        })
    }

    /// Drive the queue until it is empty.
    ///
    /// A job whose gates never open keeps the loop spinning; raise the
    /// [`StopHandle`] to get control back in that case.
    pub fn run(&mut self) -> RunReport {
        let mut report = RunReport::default();

        if self.has_stopped {
            warn!("scheduler stopped early and needs to be restarted");
            report.refused = true;
            return report;
        }

        info!(queued = self.queue.len(), "scheduler run started");

        loop {
            if self.stop_handle.is_raised() {
                info!(queued = self.queue.len(), "stop requested; leaving run loop");
                report.interrupted = true;
                break;
            }

            match self.step_once() {
                Some(tick) => report.record(&tick),
                None => break,
            }
        }

        info!(
            steps = report.steps,
            retired = report.retired.len(),
            queued = self.queue.len(),
            "scheduler run finished"
        );
        report
    }

    /// Current state of every job, active and retired, keyed by id.
    pub fn checkpoint_map(&self) -> CheckpointMap {
        let mut map = CheckpointMap::new();
        for job in self.queue.iter().filter_map(|&handle| self.job(handle)) {
            map.insert(job.id().to_string(), job.state());
        }
        for record in self.ended.iter() {
            map.insert(record.id.clone(), record.state);
        }
        map
    }

    /// Freeze the scheduler and write every job's state to the checkpoint.
    pub fn stop(&mut self) -> Result<()> {
        info!(path = ?self.checkpoint.path(), "stopping scheduler");
        self.has_stopped = true;
        let map = self.checkpoint_map();
        self.checkpoint.write(&map)?;
        info!("scheduler stopped");
        Ok(())
    }

    /// Reload job state from the checkpoint and resume the run loop.
    ///
    /// Only jobs still in the active queue are restored; retired jobs and
    /// ids absent from the file keep their in-memory state. A missing or
    /// corrupt checkpoint is returned as an error before anything changes.
    pub fn restart(&mut self) -> Result<RunReport> {
        info!(path = ?self.checkpoint.path(), "restarting scheduler");
        let saved = self.checkpoint.read()?;

        let mut restored = 0usize;
        for &handle in self.queue.iter() {
            if let Some(job) = self.jobs.get_mut(handle.index()) {
                if let Some(state) = saved.get(job.id()) {
                    job.load(state);
                    restored += 1;
                } else {
                    debug!(job = %job.id(), "no checkpoint entry; keeping in-memory state");
                }
            }
        }

        self.has_stopped = false;
        self.stop_handle.lower();
        info!(restored, "scheduler restarted");
        Ok(self.run())
    }
}
