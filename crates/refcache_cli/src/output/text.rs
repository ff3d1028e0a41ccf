//! Text output formatter

use refcache_core::Diagnostic;

use super::{IndexSummary, LookupResult};

pub fn output_index(summaries: &[IndexSummary], diagnostics: &[Diagnostic]) {
    for line in diagnostic_lines(diagnostics) {
        println!("{}", line);
    }

    for summary in summaries {
        let report = &summary.report;
        let cache = &summary.statistics.cache;
        println!();
        println!("Index '{}':", summary.name);
        println!(
            "  {} keys from {} files ({} skipped, {} without data, {} duplicate keys)",
            summary.statistics.keys,
            report.files_scanned,
            report.files_skipped,
            report.files_without_data,
            report.duplicates
        );
        println!(
            "  cache: capacity {}, {} resident, {} hits, {} loads, {} evictions",
            cache.capacity, cache.resident, cache.hits, cache.loads, cache.evictions
        );
    }

    let total_keys: usize = summaries.iter().map(|s| s.statistics.keys).sum();
    println!();
    println!(
        "Built {} indexes with {} keys, {} diagnostics",
        summaries.len(),
        total_keys,
        diagnostics.len()
    );
}

pub fn output_lookup(result: &LookupResult<'_>, diagnostics: &[Diagnostic]) {
    for line in diagnostic_lines(diagnostics) {
        eprintln!("{}", line);
    }

    match &result.fragment {
        Some(fragment) => println!("{}", fragment),
        None => eprintln!(
            "No entry for '{}' in index '{}'",
            result.key, result.index
        ),
    }
}

pub fn output_copy(document: Option<&str>, diagnostics: &[Diagnostic]) {
    for line in diagnostic_lines(diagnostics) {
        eprintln!("{}", line);
    }

    if let Some(document) = document {
        println!("{}", document);
    }
}

fn diagnostic_lines(diagnostics: &[Diagnostic]) -> impl Iterator<Item = String> + '_ {
    diagnostics.iter().map(|diag| diag.to_string())
}
