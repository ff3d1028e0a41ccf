use miette::{IntoDiagnostic, Result, miette};

use super::{build_session, load_config};
use crate::cli::Cli;
use crate::output::{LookupResult, output_lookup};

/// Builds only the named index and prints the fragment for `key`.
///
/// Returns `true` when the key is absent or an error was reported.
pub fn run_lookup(cli: &Cli, index: &str, key: &str) -> Result<bool> {
    let mut config = load_config(cli)?;
    if config.index(index).is_none() {
        return Err(miette!("Unknown index '{}'", index));
    }
    config.indexes.retain(|i| i.name == index);
    config.copy.clear();

    let session = build_session(cli, config)?;
    let cache = session
        .context
        .index(index)
        .ok_or_else(|| miette!("Index '{}' was not built", index))?;

    let fragment = cache
        .lookup(key, session.context.sink())
        .into_diagnostic()?;

    let result = LookupResult {
        index,
        key,
        file: cache.file_for(key),
        fragment: fragment.map(|doc| doc.to_xml()),
    };
    output_lookup(&result, &session.diagnostics.diagnostics(), cli.format)?;

    Ok(session.diagnostics.has_errors() || result.fragment.is_none())
}
