//! Diagnostics sink for non-fatal transform messages
//!
//! The transformer never logs through global state of its own; it reports
//! through the sink it was built with. `TracingDiagnostics` forwards to
//! `tracing`, `CollectingDiagnostics` keeps messages in memory.

use std::sync::Mutex;

pub trait Diagnostics: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards diagnostics to `tracing` under the `gdsn_transform` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "gdsn_transform", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "gdsn_transform", "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Keeps every diagnostic, e.g. to attach them to a status report
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|d| d.level == level)
            .map(|d| d.message)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Diagnostic {
                level,
                message: message.to_string(),
            });
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}
