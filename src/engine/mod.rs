// src/engine/mod.rs

//! Scheduling engine for jobloop.
//!
//! This module ties together:
//! - the bounded FIFO queue of active jobs and the retired list
//! - the cooperative run loop (dequeue -> step -> requeue or retire)
//! - the checkpoint protocol (`stop` / `restart`)
//! - an interrupt flag that lets another thread ask the loop to return
//!
//! The loop is synchronous and single-threaded: exactly one step of one job
//! runs per iteration. Unmet gates are not waited on; the job simply goes
//! back to the tail of the queue.

pub mod report;
pub mod scheduler;
pub mod stop_handle;

pub use report::{RunReport, Tick};
pub use scheduler::Scheduler;
pub use stop_handle::StopHandle;
