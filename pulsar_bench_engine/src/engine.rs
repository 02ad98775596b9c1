/// Pulsar Bench Engine - Singleton manager for engine-wide services
///
/// The only global state in this engine is the logger. Everything else
/// (render backend, cull instance pools, schedulers) is passed explicitly
/// to the subsystems that need it, so benchmarks can run several
/// configurations side by side in one process.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Result;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use pulsar_bench_engine::pulsar::Engine;
///
/// Engine::initialize()?;
/// // ... run benchmarks ...
/// # Ok::<(), pulsar_bench_engine::pulsar::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Initialize the engine
    ///
    /// Installs the default logger if none was set. Safe to call more
    /// than once.
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns Result for future extensibility.
    pub fn initialize() -> Result<()> {
        logger();
        Ok(())
    }

    /// Replace the global logger
    ///
    /// All subsequent `engine_*!` macro calls go through the new logger.
    pub fn set_logger(new_logger: Box<dyn Logger>) {
        if let Ok(mut lock) = logger().write() {
            *lock = new_logger;
        }
    }

    /// Restore the default colored console logger
    pub fn reset_logger() {
        Self::set_logger(Box::new(DefaultLogger));
    }

    /// Log a message (used by the engine_trace!/debug!/info!/warn! macros)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        };

        if let Ok(lock) = logger().read() {
            lock.log(&entry);
        }
    }

    /// Log a message with file:line details (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        };

        if let Ok(lock) = logger().read() {
            lock.log(&entry);
        }
    }

    /// Reset global state between tests (test builds only)
    #[cfg(test)]
    pub(crate) fn reset_for_testing() {
        Self::reset_logger();
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
