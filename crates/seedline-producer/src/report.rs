//! Error reporting sinks handed to a producer at construction.

use std::sync::{Mutex, PoisonError};

/// Receives user-facing error lines from a seeding run.
pub trait ErrorReporter: Send + Sync {
    /// Report one error line.
    fn error(&self, message: &str);
}

/// Forwards reports to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Keeps every report in memory so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    messages: Mutex<Vec<String>>,
}

impl CapturingReporter {
    /// Create an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages reported so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any report contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|message| message.contains(needle))
    }
}

impl ErrorReporter for CapturingReporter {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
