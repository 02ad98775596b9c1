use super::*;
use crate::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

/// Logger that captures entries for assertions
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_initialize_is_idempotent() {
    assert!(Engine::initialize().is_ok());
    assert!(Engine::initialize().is_ok());
    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_set_logger_captures_messages() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(Box::new(CaptureLogger { entries: entries.clone() }));

    crate::engine_info!("pulsar::Test", "hello {}", 7);

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].source, "pulsar::Test");
        assert_eq!(captured[0].message, "hello 7");
        assert!(captured[0].file.is_none());
    }

    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_error_macro_records_file_and_line() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(Box::new(CaptureLogger { entries: entries.clone() }));

    crate::engine_error!("pulsar::Test", "boom");

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Error);
        assert!(captured[0].file.is_some());
        assert!(captured[0].line.is_some());
    }

    Engine::reset_for_testing();
}
