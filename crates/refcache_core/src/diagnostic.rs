//! Diagnostics reported while building and consuming an index.

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Severity level for diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - the orchestrator may abort the run.
    #[default]
    Error,
    /// Warning - the affected file or entry was skipped.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// Configured verbosity for an optional diagnostic.
///
/// `Ignore` suppresses the diagnostic entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    #[default]
    Ignore,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl MessageLevel {
    /// Returns the severity to report at, or `None` when ignored.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Ignore => None,
            Self::Info => Some(Severity::Info),
            Self::Warn => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
        }
    }

    /// Parses the level names used in XML configuration, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(Self::Ignore),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A file could not be read.
    Io,
    /// A file is not well-formed XML.
    MalformedXml,
    /// A redirect could not be followed.
    Redirect,
    /// Two files provide the same key.
    DuplicateKey,
    /// A copy command found no index entry for its key.
    MissingEntry,
    /// A copy command's source expression selected nothing.
    MissingSource,
    /// A copy command's target expression selected nothing.
    MissingTarget,
}

/// A single (severity, message) report with optional context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,

    /// The file the diagnostic concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// The index key the diagnostic concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    pub fn new(kind: DiagnosticKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            file: None,
            key: None,
        }
    }

    /// Attaches the file this diagnostic concerns.
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Attaches the key this diagnostic concerns.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// A diagnostic the sink decided should abort the run.
#[derive(Debug, Clone, Error)]
#[error("{diagnostic}")]
pub struct Escalation {
    pub diagnostic: Diagnostic,
}

/// Receives diagnostics from the index and copy operations.
///
/// Implementations decide whether a diagnostic escalates; the operations
/// themselves only report and propagate the returned [`Escalation`].
pub trait DiagnosticSink: Send + Sync {
    /// Records a diagnostic.
    fn report(&self, diagnostic: Diagnostic) -> Result<(), Escalation>;
}

/// A sink that logs and stores every diagnostic.
///
/// By default nothing escalates. [`DiagnosticCollector::escalating`] builds
/// a collector that turns `Error` diagnostics into an [`Escalation`].
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Mutex<Vec<Diagnostic>>,
    escalate_errors: bool,
}

impl DiagnosticCollector {
    /// Creates a collector that never escalates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector that escalates `Error` diagnostics.
    pub fn escalating() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            escalate_errors: true,
        }
    }

    /// Returns a snapshot of the collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Removes and returns the collected diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    /// Number of collected diagnostics at `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Number of collected diagnostics of `kind`.
    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    /// Returns true if any `Error` diagnostic was collected.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&self, diagnostic: Diagnostic) -> Result<(), Escalation> {
        match diagnostic.severity {
            Severity::Error => error!(kind = ?diagnostic.kind, "{}", diagnostic.message),
            Severity::Warning => warn!(kind = ?diagnostic.kind, "{}", diagnostic.message),
            Severity::Info => info!(kind = ?diagnostic.kind, "{}", diagnostic.message),
        }

        let escalate = self.escalate_errors && diagnostic.severity == Severity::Error;
        self.diagnostics.lock().push(diagnostic.clone());

        if escalate {
            Err(Escalation { diagnostic })
        } else {
            Ok(())
        }
    }
}
