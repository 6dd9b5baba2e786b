//! Diagnostics logger
//!
//! Operational events and failures are reported through an injected
//! [`Diagnostics`] implementation instead of a process-wide logger, so each
//! recorder (and each test) can have its own.
//!
//! # Example
//!
//! ```
//! use depthtape_recorder::diagnostics::{DiagnosticLevel, Diagnostics, MemoryDiagnostics};
//!
//! let diagnostics = MemoryDiagnostics::new();
//! diagnostics.warn("rejected delta at line 3");
//!
//! assert_eq!(diagnostics.count(DiagnosticLevel::Warn), 1);
//! assert!(diagnostics.contains("line 3"));
//! ```

use chrono::Utc;
use depthtape_types::{Instrument, Timestamp};
use parking_lot::Mutex;
use std::fmt;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only sink for timestamped operational messages
pub trait Diagnostics: Send + Sync {
    /// Record a message; implementations attach the timestamp
    fn record(&self, level: DiagnosticLevel, message: &str);

    fn info(&self, message: &str) {
        self.record(DiagnosticLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(DiagnosticLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(DiagnosticLevel::Error, message);
    }
}

/// Forwards diagnostics to `tracing`, tagged with the instrument
///
/// Timestamps and output destination come from the installed subscriber.
#[derive(Debug, Clone)]
pub struct TracingDiagnostics {
    instrument: String,
}

impl TracingDiagnostics {
    /// Create a logger tagged with `instrument`
    pub fn new(instrument: &Instrument) -> Self {
        Self {
            instrument: instrument.to_string(),
        }
    }
}

impl Diagnostics for TracingDiagnostics {
    fn record(&self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Info => tracing::info!(instrument = %self.instrument, "{}", message),
            DiagnosticLevel::Warn => tracing::warn!(instrument = %self.instrument, "{}", message),
            DiagnosticLevel::Error => tracing::error!(instrument = %self.instrument, "{}", message),
        }
    }
}

/// A recorded diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    /// Wall-clock time the message was recorded
    pub at: Timestamp,
    pub level: DiagnosticLevel,
    pub message: String,
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.at.to_rfc3339(), self.level, self.message)
    }
}

/// Keeps diagnostics in memory for inspection
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl MemoryDiagnostics {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries.lock().clone()
    }

    /// Number of entries at `level`
    pub fn count(&self, level: DiagnosticLevel) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }

    /// True if any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, level: DiagnosticLevel, message: &str) {
        self.entries.lock().push(DiagnosticEntry {
            at: Utc::now(),
            level,
            message: message.to_string(),
        });
    }
}
