#![allow(dead_code)]

pub use jobloop_test_utils::builders;
pub use jobloop_test_utils::units;
pub use jobloop_test_utils::{epoch, init_tracing};

use std::sync::Arc;

use jobloop::checkpoint::CheckpointFile;
use jobloop::clock::ManualClock;
use jobloop::engine::Scheduler;
use jobloop::fs::mock::MockFileSystem;

pub const CHECKPOINT: &str = "state/scheduler_info.json";

/// Scheduler on a manual clock with its checkpoint in an in-memory fs.
pub fn mock_scheduler(pool_size: usize, clock: &ManualClock, fs: &MockFileSystem) -> Scheduler {
    Scheduler::new(pool_size)
        .with_clock(Arc::new(clock.clone()))
        .with_checkpoint(CheckpointFile::new(CHECKPOINT, Arc::new(fs.clone())))
}
