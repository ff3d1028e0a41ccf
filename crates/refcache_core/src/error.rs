//! Index error types.

use std::path::PathBuf;

use refcache_xml::XPathError;
use thiserror::Error;

use crate::diagnostic::Escalation;

/// Errors that stop an index build or a copy operation.
///
/// Problems local to one file or one lookup are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead and never show up here,
/// unless the diagnostic sink chose to escalate them.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error outside of per-file loading (e.g. reading a config file).
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path expression failed to compile or evaluate.
    #[error("XPath error: {0}")]
    XPath(#[from] XPathError),

    /// The build was cancelled between files.
    #[error("Index build cancelled")]
    Cancelled,

    /// The diagnostic sink escalated a reported diagnostic.
    #[error(transparent)]
    Escalated(#[from] Escalation),
}

impl IndexError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
