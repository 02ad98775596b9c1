/// Worker pool and completion monitor for the threaded strategies.
///
/// Workers pull tasks off a crossbeam channel, execute them, and bump a
/// single shared completion counter. The scheduler thread never polls:
/// it blocks on the counter's condvar until the count it cares about is
/// reached.

use std::sync::Arc;
use std::thread::JoinHandle;
use crossbeam::channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use crate::{engine_debug, engine_warn};
use super::task::Task;

const LOG_SOURCE: &str = "pulsar::Scheduler";

/// Shared completion counter with a condvar.
pub(super) struct CompletionMonitor {
    completed: Mutex<usize>,
    condvar: Condvar,
}

impl CompletionMonitor {
    pub(super) fn new() -> Self {
        Self {
            completed: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    pub(super) fn reset(&self) {
        *self.completed.lock() = 0;
    }

    pub(super) fn task_done(&self) {
        *self.completed.lock() += 1;
        self.condvar.notify_all();
    }

    /// Block until at least `count` tasks completed since the last reset.
    pub(super) fn wait_for(&self, count: usize) {
        let mut completed = self.completed.lock();
        while *completed < count {
            self.condvar.wait(&mut completed);
        }
    }

    /// Block until the count moves past `seen`; returns the new count.
    pub(super) fn wait_past(&self, seen: usize) -> usize {
        let mut completed = self.completed.lock();
        while *completed <= seen {
            self.condvar.wait(&mut completed);
        }
        *completed
    }
}

enum WorkerMessage {
    Run(Arc<Task>),
    Quit,
}

/// Fixed-size pool of task execution threads.
pub(super) struct WorkerPool {
    sender: Sender<WorkerMessage>,
    handles: Vec<JoinHandle<()>>,
    monitor: Arc<CompletionMonitor>,
}

impl WorkerPool {
    pub(super) fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = unbounded::<WorkerMessage>();
        let monitor = Arc::new(CompletionMonitor::new());

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = receiver.clone();
            let monitor = monitor.clone();
            let handle = std::thread::Builder::new()
                .name(format!("pulsar-worker-{}", index))
                .spawn(move || {
                    while let Ok(WorkerMessage::Run(task)) = receiver.recv() {
                        task.execute();
                        monitor.task_done();
                    }
                });
            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => engine_warn!(LOG_SOURCE, "failed to spawn worker {}: {}", index, e),
            }
        }
        engine_debug!(LOG_SOURCE, "worker pool started with {} threads", handles.len());

        Self {
            sender,
            handles,
            monitor,
        }
    }

    pub(super) fn monitor(&self) -> &Arc<CompletionMonitor> {
        &self.monitor
    }

    pub(super) fn run(&self, task: Arc<Task>) {
        // recv only errors after shutdown, when nothing is enqueued
        let _ = self.sender.send(WorkerMessage::Run(task));
    }

    pub(super) fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.sender.send(WorkerMessage::Quit);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
