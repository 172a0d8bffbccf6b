// src/job/mod.rs

//! Jobs: a resumable unit plus the metadata that decides when it may step.
//!
//! - [`outcome`] holds the tagged result of a single step.
//! - [`deps`] provides the dependency view a job reads its gates from.
//!
//! A job is driven exclusively through [`Job::step`]. Gates are evaluated in
//! a fixed order: budget exhaustion first, then readiness (`start_at`, then
//! dependencies), and only then the unit itself.

pub mod deps;
pub mod outcome;

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::checkpoint::{JobRecord, JobState};
use crate::clock::{elapsed_secs, Clock};
use crate::types::JobId;
use crate::unit::ResumableUnit;

pub use deps::{ArenaView, DependencyLookup, NoDependencies};
pub use outcome::{ExhaustReason, NotReady, StepOutcome};

/// Index of a job in the scheduler's arena.
///
/// Handles are handed out by `Scheduler::schedule` and are only meaningful
/// for the scheduler that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(usize);

impl JobHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Job {
    id: JobId,
    unit: Box<dyn ResumableUnit>,
    max_working_time: Option<f64>,
    start_at: Option<DateTime<Utc>>,
    depends: Vec<JobHandle>,
    tries: i64,
    actual_working_time: f64,
    is_done: bool,
    is_stopped: bool,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("unit", &self.unit.describe())
            .field("max_working_time", &self.max_working_time)
            .field("start_at", &self.start_at)
            .field("depends", &self.depends)
            .field("tries", &self.tries)
            .field("actual_working_time", &self.actual_working_time)
            .field("is_done", &self.is_done)
            .field("is_stopped", &self.is_stopped)
            .finish()
    }
}

impl Job {
    /// Create a job with no gates and a zero retry budget: the first
    /// transient failure leaves it one step away from exhaustion.
    pub fn new(id: impl Into<JobId>, unit: Box<dyn ResumableUnit>) -> Self {
        let job = Self {
            id: id.into(),
            unit,
            max_working_time: None,
            start_at: None,
            depends: Vec::new(),
            tries: 0,
            actual_working_time: 0.0,
            is_done: false,
            is_stopped: false,
        };
        debug!(job = %job.id, unit = %job.unit.describe(), "job created");
        job
    }

    pub fn with_tries(mut self, tries: i64) -> Self {
        self.tries = tries;
        self
    }

    /// Working-time budget in seconds.
    pub fn with_max_working_time(mut self, secs: f64) -> Self {
        self.max_working_time = Some(secs);
        self
    }

    pub fn with_start_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self
    }

    /// Wait for `dependency` to be done before stepping. Order is kept and
    /// decides which dependency is reported when several are pending.
    pub fn depends_on(mut self, dependency: JobHandle) -> Self {
        self.depends.push(dependency);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn depends(&self) -> &[JobHandle] {
        &self.depends
    }

    pub fn tries(&self) -> i64 {
        self.tries
    }

    pub fn actual_working_time(&self) -> f64 {
        self.actual_working_time
    }

    pub fn max_working_time(&self) -> Option<f64> {
        self.max_working_time
    }

    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        self.start_at
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    pub fn is_stopped(&self) -> bool {
        self.is_stopped
    }

    /// Advance the job by at most one unit step.
    pub fn step(&mut self, clock: &dyn Clock, deps: &dyn DependencyLookup) -> StepOutcome {
        if self.is_done {
            debug!(job = %self.id, "step on a finished job; unit left untouched");
            return StepOutcome::Completed;
        }

        if let Some(reason) = self.exhaustion() {
            info!(job = %self.id, ?reason, "job budget exhausted; retiring");
            self.stop();
            return StepOutcome::Exhausted(reason);
        }

        if let Some(gate) = self.closed_gate(clock, deps) {
            debug!(job = %self.id, ?gate, "job not ready");
            return StepOutcome::NotReady(gate);
        }

        debug!(job = %self.id, unit = %self.unit.describe(), "running job step");
        let started = clock.now();
        match self.unit.step() {
            Ok(Some(value)) => {
                self.actual_working_time += elapsed_secs(started, clock.now());
                debug!(
                    job = %self.id,
                    actual_working_time = self.actual_working_time,
                    "job step produced a value"
                );
                StepOutcome::Value(value)
            }
            Ok(None) => {
                info!(job = %self.id, "unit finished; job complete");
                self.stop();
                StepOutcome::Completed
            }
            Err(err) => {
                self.tries -= 1;
                let message = format!("{err:#}");
                error!(
                    job = %self.id,
                    tries = self.tries,
                    error = %message,
                    "job step failed"
                );
                StepOutcome::TransientError(message)
            }
        }
    }

    fn exhaustion(&self) -> Option<ExhaustReason> {
        if self.tries < 0 {
            return Some(ExhaustReason::TriesExhausted { tries: self.tries });
        }
        match self.max_working_time {
            Some(max) if self.actual_working_time >= max => Some(ExhaustReason::TimeBudget {
                actual: self.actual_working_time,
                max,
            }),
            _ => None,
        }
    }

    fn closed_gate(&self, clock: &dyn Clock, deps: &dyn DependencyLookup) -> Option<NotReady> {
        if let Some(start_at) = self.start_at {
            if clock.now() < start_at {
                return Some(NotReady::NotYetStarted { start_at });
            }
        }

        self.depends
            .iter()
            .find(|&&handle| deps.is_done(handle) != Some(true))
            .map(|&handle| NotReady::DependencyPending {
                dependency: deps
                    .id_of(handle)
                    .map(str::to_string)
                    .unwrap_or_else(|| handle.to_string()),
            })
    }

    /// Set the pause flag. Stepping does not look at it.
    pub fn pause(&mut self) {
        self.is_stopped = true;
    }

    /// Mark the job done. It will never step again.
    pub fn stop(&mut self) {
        self.is_done = true;
    }

    pub fn state(&self) -> JobState {
        JobState {
            actual_working_time: self.actual_working_time,
            is_done: self.is_done,
            is_stopped: self.is_stopped,
            tries: self.tries,
        }
    }

    pub fn dump(&self) -> JobRecord {
        JobRecord {
            id: self.id.clone(),
            state: self.state(),
        }
    }

    /// Overwrite the mutable state from a checkpoint. The id is never touched.
    pub fn load(&mut self, state: &JobState) {
        self.actual_working_time = state.actual_working_time;
        self.is_done = state.is_done;
        self.is_stopped = state.is_stopped;
        self.tries = state.tries;
        debug!(job = %self.id, ?state, "job state restored");
    }
}
