//! Output formatting module

mod json;
mod text;

use std::path::PathBuf;

use miette::Result;
use refcache_core::{CopyOutcome, Diagnostic, IndexStatistics, IngestReport};

use crate::cli::OutputFormat;

/// Result of building one index.
pub struct IndexSummary {
    pub name: String,
    pub report: IngestReport,
    pub statistics: IndexStatistics,
}

/// Result of a lookup.
pub struct LookupResult<'a> {
    pub index: &'a str,
    pub key: &'a str,
    pub file: Option<PathBuf>,
    pub fragment: Option<String>,
}

pub fn output_index(
    summaries: &[IndexSummary],
    diagnostics: &[Diagnostic],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_index(summaries, diagnostics),
        OutputFormat::Text => {
            text::output_index(summaries, diagnostics);
            Ok(())
        }
    }
}

pub fn output_lookup(
    result: &LookupResult<'_>,
    diagnostics: &[Diagnostic],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_lookup(result, diagnostics),
        OutputFormat::Text => {
            text::output_lookup(result, diagnostics);
            Ok(())
        }
    }
}

pub fn output_copy(
    outcomes: &[CopyOutcome],
    document: Option<&str>,
    diagnostics: &[Diagnostic],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_copy(outcomes, document, diagnostics),
        OutputFormat::Text => {
            text::output_copy(document, diagnostics);
            Ok(())
        }
    }
}
