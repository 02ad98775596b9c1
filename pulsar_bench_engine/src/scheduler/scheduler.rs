/// Scheduler — ordered execution and submission of frame tasks.
///
/// Tasks are scheduled with a build order (and, for render tasks, a
/// submit order), finalized once into a stable submission sequence, and
/// then executed every frame. Whatever strategy runs the closures, jobs
/// reach the backend in exactly the finalized sequence.

use std::sync::Arc;
use crate::engine_error;
use crate::renderer::{JobId, RenderBackend};
use super::task::Task;
use super::worker::WorkerPool;

const LOG_SOURCE: &str = "pulsar::Scheduler";

/// How scheduled tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Execute and submit each task inline, in sequence.
    SingleThreaded,
    /// Execute everything on the pool, then submit after all completed.
    Barrier { workers: usize },
    /// Execute on the pool and submit each task as soon as it and every
    /// task before it completed.
    OnDemand { workers: usize },
}

pub struct Scheduler {
    backend: Arc<dyn RenderBackend>,
    strategy: ExecutionStrategy,
    tasks: Vec<Arc<Task>>,
    finalized: bool,
    pool: Option<WorkerPool>,
}

impl Scheduler {
    pub fn new(backend: Arc<dyn RenderBackend>, strategy: ExecutionStrategy) -> Self {
        let pool = match strategy {
            ExecutionStrategy::SingleThreaded => None,
            ExecutionStrategy::Barrier { workers } | ExecutionStrategy::OnDemand { workers } => {
                Some(WorkerPool::new(workers))
            }
        };

        Self {
            backend,
            strategy,
            tasks: Vec::new(),
            finalized: false,
            pool,
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // ===== BUILDING =====

    /// Schedule CPU work at a build position.
    ///
    /// # Panics
    ///
    /// When called after `finalize`.
    pub fn schedule_cpu(&mut self, build_order: u32, work: impl FnMut() + Send + 'static) {
        self.check_not_finalized();
        self.tasks.push(Arc::new(Task::cpu(build_order, Box::new(work))));
    }

    /// Schedule render job recording at a build and submit position.
    ///
    /// # Panics
    ///
    /// When called after `finalize`.
    pub fn schedule_render(
        &mut self,
        build_order: u32,
        submit_order: u32,
        record: impl FnMut() -> JobId + Send + 'static,
    ) {
        self.check_not_finalized();
        self.tasks
            .push(Arc::new(Task::render(build_order, submit_order, Box::new(record))));
    }

    /// Freeze the task list into its submission sequence.
    ///
    /// # Panics
    ///
    /// When called twice.
    pub fn finalize(&mut self) {
        if self.finalized {
            engine_error!(LOG_SOURCE, "finalize called twice");
            panic!("scheduler already finalized");
        }
        self.finalized = true;
        // Stable: equal orders keep their scheduling sequence
        self.tasks
            .sort_by_key(|task| (task.build_order(), task.submit_order()));
        debug_assert!(self
            .tasks
            .windows(2)
            .all(|w| (w[0].build_order(), w[0].submit_order())
                <= (w[1].build_order(), w[1].submit_order())));
    }

    fn check_not_finalized(&self) {
        if self.finalized {
            engine_error!(LOG_SOURCE, "schedule called after finalize");
            panic!("cannot schedule on a finalized scheduler");
        }
    }

    // ===== EXECUTION =====

    /// Run one frame of tasks.
    ///
    /// # Panics
    ///
    /// When the scheduler was not finalized.
    pub fn execute(&mut self) {
        if !self.finalized {
            engine_error!(LOG_SOURCE, "execute called before finalize");
            panic!("scheduler not finalized");
        }
        if self.tasks.is_empty() {
            return;
        }
        for task in &self.tasks {
            task.reset();
        }

        match self.strategy {
            ExecutionStrategy::SingleThreaded => self.execute_single_threaded(),
            ExecutionStrategy::Barrier { .. } => self.execute_barrier(),
            ExecutionStrategy::OnDemand { .. } => self.execute_on_demand(),
        }
    }

    fn execute_single_threaded(&self) {
        for task in &self.tasks {
            task.execute();
            task.submit(self.backend.as_ref());
        }
    }

    fn execute_barrier(&self) {
        let Some(pool) = self.pool.as_ref() else { unreachable!() };
        pool.monitor().reset();
        for task in &self.tasks {
            pool.run(task.clone());
        }
        pool.monitor().wait_for(self.tasks.len());

        for task in &self.tasks {
            task.submit(self.backend.as_ref());
        }
    }

    fn execute_on_demand(&self) {
        let Some(pool) = self.pool.as_ref() else { unreachable!() };
        let monitor = pool.monitor().clone();
        monitor.reset();
        for task in &self.tasks {
            pool.run(task.clone());
        }

        // Submit the longest completed prefix, then sleep until more
        // tasks finish. Completion order is arbitrary; submission order
        // is not.
        let mut cursor = 0;
        let mut seen = 0;
        while cursor < self.tasks.len() {
            while cursor < self.tasks.len() && self.tasks[cursor].is_completed() {
                self.tasks[cursor].submit(self.backend.as_ref());
                cursor += 1;
            }
            if cursor == self.tasks.len() {
                break;
            }
            seen = monitor.wait_past(seen);
        }

        // A task's completion flag flips before its counter bump; wait
        // out the counter so no bump leaks into the next frame's reset
        monitor.wait_for(self.tasks.len());
    }

    /// Stop the worker pool. Called by `drop`; explicit calls are
    /// idempotent.
    pub fn shutdown(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
