// src/engine/stop_handle.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cross-thread request for the run loop to return.
///
/// The loop checks the flag between steps, never during one, so a raised
/// handle leaves every job in a consistent state for checkpointing.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    raised: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn lower(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
