//! Subcommand implementations

mod copy;
mod index;
mod lookup;

pub use copy::run_copy;
pub use index::run_index;
pub use lookup::run_lookup;

use std::sync::Arc;

use miette::{IntoDiagnostic, Result, miette};
use refcache_core::{
    BuildConfig, BuildContext, CONFIG_FILES, DiagnosticCollector, IndexRegistry, IngestReport,
};
use tracing::info;

use crate::cli::Cli;

/// Indexes built for one command run.
struct Session {
    config: BuildConfig,
    context: BuildContext,
    diagnostics: Arc<DiagnosticCollector>,
    reports: Vec<(String, IngestReport)>,
}

fn load_config(cli: &Cli) -> Result<BuildConfig> {
    if let Some(ref path) = cli.config {
        return BuildConfig::from_file(path).into_diagnostic();
    }

    match BuildConfig::discover(".") {
        Some(path) => {
            info!("Using config: {}", path.display());
            BuildConfig::from_file(&path).into_diagnostic()
        }
        None => Err(miette!(
            "No configuration found. Pass --config or create one of: {}",
            CONFIG_FILES.join(", ")
        )),
    }
}

fn build_session(cli: &Cli, config: BuildConfig) -> Result<Session> {
    let diagnostics = Arc::new(if cli.strict {
        DiagnosticCollector::escalating()
    } else {
        DiagnosticCollector::new()
    });

    let mut context = BuildContext::new(diagnostics.clone());
    let reports = context
        .build_indexes(&config, &IndexRegistry::default())
        .into_diagnostic()?;

    Ok(Session {
        config,
        context,
        diagnostics,
        reports,
    })
}
