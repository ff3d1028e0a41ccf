//! Build context.
//!
//! A [`BuildContext`] holds everything one build run shares between its
//! components: the named indexes, the diagnostic sink and the cancellation
//! token. Components receive the context when they are constructed, so two
//! runs in the same process never see each other's indexes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::config::BuildConfig;
use crate::diagnostic::DiagnosticSink;
use crate::error::IndexError;
use crate::index::{CancellationToken, IndexStatistics, IndexedCache, IngestReport};
use crate::registry::IndexRegistry;

/// Shared state of one build run.
pub struct BuildContext {
    indexes: BTreeMap<String, Arc<dyn IndexedCache>>,
    sink: Arc<dyn DiagnosticSink>,
    cancellation: CancellationToken,
}

impl BuildContext {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            indexes: BTreeMap::new(),
            sink,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    pub fn shared_sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&self.sink)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Adds an index under its own name.
    pub fn register_index(&mut self, index: Arc<dyn IndexedCache>) -> Result<(), IndexError> {
        let name = index.name().to_string();
        if self.indexes.contains_key(&name) {
            return Err(IndexError::config(format!(
                "An index named '{}' already exists",
                name
            )));
        }
        self.indexes.insert(name, index);
        Ok(())
    }

    pub fn index(&self, name: &str) -> Option<Arc<dyn IndexedCache>> {
        self.indexes.get(name).map(Arc::clone)
    }

    /// Indexes in name order.
    pub fn indexes(&self) -> impl Iterator<Item = &Arc<dyn IndexedCache>> {
        self.indexes.values()
    }

    /// Creates and fills every index in `config`.
    ///
    /// Indexes are built one after another; the files of each data source
    /// are processed in parallel. Returns one merged report per index.
    pub fn build_indexes(
        &mut self,
        config: &BuildConfig,
        registry: &IndexRegistry,
    ) -> Result<Vec<(String, IngestReport)>, IndexError> {
        config.validate()?;
        let variables = config.variables();
        let mut reports = Vec::with_capacity(config.indexes.len());

        for index_config in &config.indexes {
            let index = registry.create(index_config, variables.clone())?;

            let mut report = IngestReport::default();
            for source in &index_config.sources {
                report += index.add_documents(source, self.sink(), &self.cancellation)?;
            }

            info!(
                "Index '{}' ready: {} keys from {} files",
                index_config.name,
                index.count(),
                report.files_scanned
            );
            self.register_index(index)?;
            reports.push((index_config.name.clone(), report));
        }

        Ok(reports)
    }

    /// Statistics of every index, in name order.
    pub fn statistics(&self) -> Vec<IndexStatistics> {
        self.indexes().map(|index| index.statistics()).collect()
    }
}
