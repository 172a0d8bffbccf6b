// src/job/outcome.rs

//! Result of a single `Job::step`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::JobId;

/// What happened during one step of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The unit produced a value; the job stays pending.
    Value(Value),
    /// A readiness gate is closed. Nothing ran and no budget was spent.
    NotReady(NotReady),
    /// The retry or time budget ran out. Terminal.
    Exhausted(ExhaustReason),
    /// The unit reported end of sequence. Terminal.
    Completed,
    /// The unit failed; `tries` was decremented and the job stays pending.
    TransientError(String),
}

impl StepOutcome {
    /// Whether this outcome retires the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::Exhausted(_) | StepOutcome::Completed)
    }
}

/// Which readiness gate kept a job from running.
#[derive(Debug, Clone, PartialEq)]
pub enum NotReady {
    /// `start_at` lies in the future.
    NotYetStarted { start_at: DateTime<Utc> },
    /// The first dependency (in declaration order) that is not done yet.
    DependencyPending { dependency: JobId },
}

/// Why a job's budget is considered spent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExhaustReason {
    /// `tries` went negative after transient failures.
    TriesExhausted { tries: i64 },
    /// `actual_working_time` reached `max_working_time`.
    TimeBudget { actual: f64, max: f64 },
}
