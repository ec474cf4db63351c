use std::fmt;
use std::sync::Mutex;

/// How serious a diagnostic message is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Sink for the builder's and analyzer's running commentary.
///
/// Held as `Arc<dyn Diagnostics>` so one sink can be shared between
/// several builders and analyzers.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
}

/// Forwards every message to `tracing` under the `bop` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "bop", "{message}"),
            Severity::Info => tracing::info!(target: "bop", "{message}"),
            Severity::Warning => tracing::warn!(target: "bop", "{message}"),
            Severity::Error => tracing::error!(target: "bop", "{message}"),
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn emit(&self, _severity: Severity, _message: &str) {}
}

/// Keeps messages in memory, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl MemoryDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Count of messages at `severity` or above.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.messages().iter().filter(|(s, _)| *s >= severity).count()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((severity, message.to_string()));
        }
    }
}
