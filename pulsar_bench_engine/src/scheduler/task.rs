/// Task — one unit of frame work.
///
/// A CPU task is a closure with side effects. A render task is a
/// closure that records a GPU job and returns its id; the id is held
/// until the scheduler submits it in order. Tasks are owned by the
/// Scheduler and shared with workers behind `Arc`, so all mutable
/// state sits behind a payload mutex or an atomic flag.

use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use crate::renderer::{JobId, RenderBackend};

enum TaskPayload {
    Cpu(Box<dyn FnMut() + Send>),
    Render(Box<dyn FnMut() -> JobId + Send>),
}

pub struct Task {
    /// Position in the frame build; primary submission sort key.
    build_order: u32,
    /// Tie-breaker within one build order; zero for CPU tasks.
    submit_order: u32,
    is_render: bool,
    payload: Mutex<TaskPayload>,
    job: Mutex<Option<JobId>>,
    completed: AtomicBool,
    submitted: AtomicBool,
}

impl Task {
    pub(super) fn cpu(build_order: u32, work: Box<dyn FnMut() + Send>) -> Self {
        Self {
            build_order,
            submit_order: 0,
            is_render: false,
            payload: Mutex::new(TaskPayload::Cpu(work)),
            job: Mutex::new(None),
            completed: AtomicBool::new(false),
            submitted: AtomicBool::new(false),
        }
    }

    pub(super) fn render(
        build_order: u32,
        submit_order: u32,
        record: Box<dyn FnMut() -> JobId + Send>,
    ) -> Self {
        Self {
            build_order,
            submit_order,
            is_render: true,
            payload: Mutex::new(TaskPayload::Render(record)),
            job: Mutex::new(None),
            completed: AtomicBool::new(false),
            submitted: AtomicBool::new(false),
        }
    }

    pub fn build_order(&self) -> u32 {
        self.build_order
    }

    pub fn submit_order(&self) -> u32 {
        self.submit_order
    }

    pub fn is_render(&self) -> bool {
        self.is_render
    }

    /// Recorded job id, present after a render task executed.
    pub fn job(&self) -> Option<JobId> {
        *self.job.lock()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.load(Ordering::Acquire)
    }

    /// Clear per-frame state so the task can run again.
    pub(super) fn reset(&self) {
        *self.job.lock() = None;
        self.completed.store(false, Ordering::Release);
        self.submitted.store(false, Ordering::Release);
    }

    /// Run the payload. Safe from any thread; marks the task completed.
    pub(super) fn execute(&self) {
        match &mut *self.payload.lock() {
            TaskPayload::Cpu(work) => work(),
            TaskPayload::Render(record) => {
                let job = record();
                *self.job.lock() = Some(job);
            }
        }
        self.completed.store(true, Ordering::Release);
    }

    /// Submit the recorded job. No-op for CPU tasks and for render tasks
    /// already submitted this frame.
    pub(super) fn submit(&self, backend: &dyn RenderBackend) {
        if self.submitted.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(job) = *self.job.lock() {
            backend.submit(job);
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
