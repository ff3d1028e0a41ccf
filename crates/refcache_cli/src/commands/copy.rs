use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result, miette};
use refcache_core::CopyFromIndexComponent;
use refcache_xml::Document;
use tracing::{info, warn};

use super::{build_session, load_config};
use crate::cli::Cli;
use crate::output::output_copy;

pub fn run_copy(cli: &Cli, document: &Path, key: &str, output: Option<&Path>) -> Result<bool> {
    let content = fs::read_to_string(document)
        .map_err(|e| miette!("Failed to read {}: {}", document.display(), e))?;
    let mut topic = Document::parse(&content)
        .map_err(|e| miette!("Failed to parse {}: {}", document.display(), e))?;

    let config = load_config(cli)?;
    let session = build_session(cli, config)?;

    let component = CopyFromIndexComponent::new(
        &session.context,
        &session.config.copy,
        session.config.variables(),
    )
    .into_diagnostic()?;
    if component.is_empty() {
        warn!("No copy commands configured");
    }

    let outcomes = component.apply(&mut topic, key).into_diagnostic()?;
    let xml = topic.to_xml();

    let printed = match output {
        Some(path) => {
            fs::write(path, &xml)
                .map_err(|e| miette!("Failed to write {}: {}", path.display(), e))?;
            info!("Wrote {}", path.display());
            None
        }
        None => Some(xml.as_str()),
    };

    output_copy(
        &outcomes,
        printed,
        &session.diagnostics.diagnostics(),
        cli.format,
    )?;

    Ok(session.diagnostics.has_errors())
}
