//! JSON output formatter

use miette::{IntoDiagnostic, Result};
use refcache_core::{CopyOutcome, Diagnostic};

use super::{IndexSummary, LookupResult};

pub fn output_index(summaries: &[IndexSummary], diagnostics: &[Diagnostic]) -> Result<()> {
    let indexes: Vec<_> = summaries
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.name,
                "report": s.report,
                "statistics": s.statistics,
            })
        })
        .collect();
    print(serde_json::json!({
        "indexes": indexes,
        "diagnostics": diagnostics,
    }))
}

pub fn output_lookup(result: &LookupResult<'_>, diagnostics: &[Diagnostic]) -> Result<()> {
    print(serde_json::json!({
        "index": result.index,
        "key": result.key,
        "file": result.file.as_ref().map(|f| f.display().to_string()),
        "fragment": result.fragment,
        "diagnostics": diagnostics,
    }))
}

pub fn output_copy(
    outcomes: &[CopyOutcome],
    document: Option<&str>,
    diagnostics: &[Diagnostic],
) -> Result<()> {
    print(serde_json::json!({
        "outcomes": outcomes,
        "document": document,
        "diagnostics": diagnostics,
    }))
}

fn print(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
    Ok(())
}
