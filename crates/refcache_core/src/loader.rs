//! Document loading with redirect support.
//!
//! Comment files may consist of nothing but a pointer to a shared file
//! elsewhere on disk:
//!
//! ```xml
//! <doc redirect="%PROGRAMFILESDIR%\Reference Assemblies\Framework\v4.0\mscorlib.xml" />
//! ```
//!
//! The loader follows such a pointer once. Every failure is reported to the
//! [`DiagnosticSink`] and turned into "no data" for the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use refcache_xml::Document;
use regex::{Captures, Regex};
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::error::IndexError;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%]+)%").expect("valid environment reference pattern"));

/// Root element that may carry a redirect.
const REDIRECT_ELEMENT: &str = "doc";

/// Attribute holding the redirect target.
const REDIRECT_ATTRIBUTE: &str = "redirect";

/// Loads XML files for indexing and lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Loads `path`, following a root `doc/@redirect` once.
    ///
    /// Returns `Ok(None)` when the file yields no data: I/O failures are
    /// reported as errors; malformed or undecodable content and unusable
    /// redirects as warnings. `Err` only carries an escalation from the sink.
    pub fn load(
        &self,
        path: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<Option<Document>, IndexError> {
        let Some(document) = load_file(path, sink)? else {
            return Ok(None);
        };

        let Some(redirect) = redirect_of(&document) else {
            return Ok(Some(document));
        };

        let Some(target) = resolve_redirect(redirect, |name| std::env::var(name).ok()) else {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::Redirect,
                    Severity::Warning,
                    format!(
                        "Unable to resolve redirect '{}' in {}: the path is not rooted or \
                         contains an undefined environment variable",
                        redirect,
                        path.display()
                    ),
                )
                .with_file(path),
            )?;
            return Ok(None);
        };

        if !target.exists() {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::Redirect,
                    Severity::Warning,
                    format!(
                        "Redirect target '{}' in {} does not exist",
                        target.display(),
                        path.display()
                    ),
                )
                .with_file(path),
            )?;
            return Ok(None);
        }

        debug!("Following redirect {} -> {}", path.display(), target.display());
        load_file(&target, sink)
    }
}

fn load_file(path: &Path, sink: &dyn DiagnosticSink) -> Result<Option<Document>, IndexError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::Io,
                    Severity::Error,
                    format!("Unable to read {}: {}", path.display(), e),
                )
                .with_file(path),
            )?;
            return Ok(None);
        }
    };

    match Document::from_bytes(&content) {
        Ok(document) => {
            debug!("Loaded {}", path.display());
            Ok(Some(document))
        }
        Err(e) => {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::MalformedXml,
                    Severity::Warning,
                    format!("Ignoring malformed XML in {}: {}", path.display(), e),
                )
                .with_file(path),
            )?;
            Ok(None)
        }
    }
}

fn redirect_of(document: &Document) -> Option<&str> {
    let root = document.document_element()?;
    if document.name(root) != Some(REDIRECT_ELEMENT) {
        return None;
    }
    document
        .attribute(root, REDIRECT_ATTRIBUTE)
        .filter(|value| !value.trim().is_empty())
}

/// Expands `%NAME%` references in `value` using `lookup`.
///
/// `%PROGRAMFILESDIR%` resolves to the 32-bit program files directory when
/// one exists and to `ProgramFiles` otherwise; `%CommonProgramFiles%` is
/// handled the same way. Unknown references are left in place.
pub fn expand_environment<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(value, |caps: &Captures<'_>| {
            let name = &caps[1];
            let resolved = if name.eq_ignore_ascii_case("PROGRAMFILESDIR") {
                lookup("ProgramFiles(x86)").or_else(|| lookup("ProgramFiles"))
            } else if name.eq_ignore_ascii_case("CommonProgramFiles") {
                lookup("CommonProgramFiles(x86)").or_else(|| lookup("CommonProgramFiles"))
            } else {
                lookup(name)
            };
            resolved.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Turns a redirect value into a rooted path, or `None` if it cannot be.
fn resolve_redirect<F>(value: &str, lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_environment(value.trim(), lookup);
    if ENV_REFERENCE.is_match(&expanded) {
        return None;
    }

    #[cfg(not(windows))]
    let expanded = expanded.replace('\\', "/");

    let path = PathBuf::from(expanded);
    path.is_absolute().then_some(path)
}
