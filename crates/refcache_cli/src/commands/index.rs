use miette::Result;

use super::{build_session, load_config};
use crate::cli::Cli;
use crate::output::{IndexSummary, output_index};

pub fn run_index(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    let session = build_session(cli, config)?;

    let summaries: Vec<IndexSummary> = session
        .reports
        .into_iter()
        .filter_map(|(name, report)| {
            let statistics = session.context.index(&name)?.statistics();
            Some(IndexSummary {
                name,
                report,
                statistics,
            })
        })
        .collect();

    output_index(&summaries, &session.diagnostics.diagnostics(), cli.format)?;

    Ok(session.diagnostics.has_errors())
}
