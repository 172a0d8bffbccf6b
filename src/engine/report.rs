// src/engine/report.rs

//! Step-by-step and whole-run results of the scheduler.

use crate::job::{JobHandle, StepOutcome};
use crate::types::JobId;

/// Structured result of a single scheduler iteration.
///
/// Returned by `Scheduler::step_once`; useful for tests that want to walk
/// the queue manually and make assertions about each step.
#[derive(Debug, Clone)]
pub struct Tick {
    pub handle: JobHandle,
    pub job: JobId,
    pub outcome: StepOutcome,
    /// Whether the job moved to the retired list in this iteration.
    pub retired: bool,
}

/// Summary of one call to `Scheduler::run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// The scheduler was stopped and refused to run.
    pub refused: bool,
    /// The loop returned because its `StopHandle` was raised.
    pub interrupted: bool,
    /// Loop iterations, including not-ready spins.
    pub steps: usize,
    pub values: usize,
    pub not_ready: usize,
    pub transient_errors: usize,
    /// Ids of jobs retired during this run, in retirement order.
    pub retired: Vec<JobId>,
}

impl RunReport {
    pub fn record(&mut self, tick: &Tick) {
        self.steps += 1;
        match tick.outcome {
            StepOutcome::Value(_) => self.values += 1,
            StepOutcome::NotReady(_) => self.not_ready += 1,
            StepOutcome::TransientError(_) => self.transient_errors += 1,
            StepOutcome::Exhausted(_) | StepOutcome::Completed => {}
        }
        if tick.retired {
            self.retired.push(tick.job.clone());
        }
    }
}
