//! Unit tests for log.rs
//!
//! Tests severity ordering, DefaultLogger filtering and formatting.
//! Macro tests that go through the global logger live in tests/logging_integration_tests.rs.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "ofvk::Test".to_string(),
        message: "message".to_string(),
        file,
        line,
    }
}

// ============================================================================
// SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label().trim(), "WARN");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_min_severity_filter() {
    let logger = DefaultLogger::new(LogSeverity::Warn);
    assert_eq!(logger.min_severity(), LogSeverity::Warn);
    assert!(!logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Warn));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_default_severity() {
    let logger = DefaultLogger::default();
    if cfg!(debug_assertions) {
        assert_eq!(logger.min_severity(), LogSeverity::Debug);
    } else {
        assert_eq!(logger.min_severity(), LogSeverity::Info);
    }
    assert!(!logger.accepts(LogSeverity::Trace));
}

#[test]
fn test_default_logger_format_without_location() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Info, None, None));
    assert!(line.ends_with("[INFO ] [ofvk::Test] message"));
    assert!(line.starts_with('['));
}

#[test]
fn test_default_logger_format_with_location() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Error, Some("frame.rs"), Some(42)));
    assert!(line.ends_with("[ERROR] [ofvk::Test] message (frame.rs:42)"));
}

#[test]
fn test_default_logger_logs_all_severities() {
    // Only verifies nothing panics on either branch
    let logger = DefaultLogger::new(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(1)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
