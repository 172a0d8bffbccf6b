// src/job/deps.rs

//! Dependency lookups for the readiness gate.
//!
//! A job only stores [`JobHandle`]s of the jobs it waits for. While one job
//! is being stepped, the scheduler lends it a read-only view of every other
//! job in the arena through [`DependencyLookup`].

use crate::job::{Job, JobHandle};

pub trait DependencyLookup {
    /// `Some(done)` for a known job, `None` for a handle outside the view.
    fn is_done(&self, handle: JobHandle) -> Option<bool>;
    fn id_of(&self, handle: JobHandle) -> Option<&str>;
}

/// Lookup for jobs stepped outside a scheduler: no job is known, so a job
/// with dependencies never becomes ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyLookup for NoDependencies {
    fn is_done(&self, _handle: JobHandle) -> Option<bool> {
        None
    }

    fn id_of(&self, _handle: JobHandle) -> Option<&str> {
        None
    }
}

/// The arena with one job (the one being stepped) cut out.
///
/// Built from `split_at_mut` so the stepped job can be borrowed mutably while
/// its neighbours are read. A job asking about its own handle gets `None`.
#[derive(Debug)]
pub struct ArenaView<'a> {
    before: &'a [Job],
    after: &'a [Job],
    pivot: usize,
}

impl<'a> ArenaView<'a> {
    pub fn new(before: &'a [Job], after: &'a [Job]) -> Self {
        Self {
            before,
            after,
            pivot: before.len(),
        }
    }

    fn get(&self, handle: JobHandle) -> Option<&'a Job> {
        let idx = handle.index();
        if idx < self.pivot {
            self.before.get(idx)
        } else if idx > self.pivot {
            self.after.get(idx - self.pivot - 1)
        } else {
            None
        }
    }
}

impl DependencyLookup for ArenaView<'_> {
    fn is_done(&self, handle: JobHandle) -> Option<bool> {
        self.get(handle).map(Job::is_done)
    }

    fn id_of(&self, handle: JobHandle) -> Option<&str> {
        self.get(handle).map(Job::id)
    }
}
