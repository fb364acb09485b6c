//! Diagnostic output for registration outcomes
//!
//! Owners learn why a registration failed from the returned error; the sink
//! is where the same outcome is reported to the user, including the list of
//! owners a `Taken` combination collided with.

use std::fmt;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Receives human-readable diagnostics from the engine.
pub trait DiagnosticSink {
    fn write(&self, message: &str, severity: Severity);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Debug => tracing::debug!(target: "keychord", "{}", message),
            Severity::Info | Severity::Success => tracing::info!(target: "keychord", "{}", message),
            Severity::Warning => tracing::warn!(target: "keychord", "{}", message),
            Severity::Error => tracing::error!(target: "keychord", "{}", message),
        }
    }
}

/// Collects diagnostics in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: std::cell::RefCell<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message written so far.
    pub fn drain(&self) -> Vec<(Severity, String)> {
        self.messages.take()
    }
}

impl DiagnosticSink for RecordingSink {
    fn write(&self, message: &str, severity: Severity) {
        self.messages.borrow_mut().push((severity, message.to_string()));
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn write(&self, message: &str, severity: Severity) {
        (**self).write(message, severity)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for std::rc::Rc<T> {
    fn write(&self, message: &str, severity: Severity) {
        (**self).write(message, severity)
    }
}
