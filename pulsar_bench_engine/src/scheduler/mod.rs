//! Frame task scheduling module
//!
//! Builds a frame as a list of ordered tasks (CPU work and render job
//! recording), executes them single-threaded or on a worker pool, and
//! submits the recorded jobs to the backend in a deterministic order
//! regardless of which thread finished first.

mod scheduler;
mod task;
mod worker;

pub use scheduler::{ExecutionStrategy, Scheduler};
pub use task::Task;
