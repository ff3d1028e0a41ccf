//! Cross-reference index.
//!
//! An index maps every key found in a set of XML files to the file that
//! defines it. Files are only parsed again when a lookup needs them, and
//! at most `cache` parsed files stay in memory at once.

use std::collections::HashSet;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use rayon::prelude::*;
use refcache_cache::{CacheStatistics, FifoCache};
use refcache_xml::{Document, Variables};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DataSource, IndexConfig};
use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::document::CachedDocument;
use crate::error::IndexError;
use crate::extractor::KeyExtractor;
use crate::file_finder::FileFinder;
use crate::loader::DocumentLoader;

/// A key index with on-demand fragment lookup.
///
/// Implementations must allow `add_documents` and `lookup` to be called
/// from several threads at once.
pub trait IndexedCache: Send + Sync {
    /// The index name copy commands refer to.
    fn name(&self) -> &str;

    /// Indexes every file of `source`.
    ///
    /// Files are processed in parallel. When several files define the same
    /// key the one recorded last wins, so the winner between files of the
    /// same call is not deterministic.
    fn add_documents(
        &self,
        source: &DataSource,
        sink: &dyn DiagnosticSink,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IndexError>;

    /// Returns a detached copy of the fragment stored under `key`.
    fn lookup(&self, key: &str, sink: &dyn DiagnosticSink) -> Result<Option<Document>, IndexError>;

    /// Number of distinct keys.
    fn count(&self) -> usize;

    fn contains_key(&self, key: &str) -> bool;

    /// The file currently providing `key`.
    fn file_for(&self, key: &str) -> Option<PathBuf>;

    /// All keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn statistics(&self) -> IndexStatistics;
}

/// Cooperative cancellation flag, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one `add_documents` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Files parsed.
    pub files_scanned: usize,
    /// Files left out by the allow-list.
    pub files_skipped: usize,
    /// Parsed files that could not be read, were malformed, or redirected
    /// nowhere.
    pub files_without_data: usize,
    /// Keys that were new to the index.
    pub keys_added: usize,
    /// Keys that replaced an entry from another file.
    pub duplicates: usize,
}

impl AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self.files_without_data += other.files_without_data;
        self.keys_added += other.keys_added;
        self.duplicates += other.duplicates;
    }
}

/// Counters of an index and its document cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatistics {
    pub name: String,
    pub keys: usize,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub files_without_data: u64,
    pub duplicates: u64,
    pub cache: CacheStatistics,
}

/// Per-file result of ingestion.
#[derive(Debug, Default)]
struct FileOutcome {
    has_data: bool,
    keys_added: usize,
    duplicates: usize,
}

/// An [`IndexedCache`] keeping the key map in memory and parsed files in a
/// bounded FIFO cache.
pub struct InMemoryIndexedCache {
    name: String,
    extractor: KeyExtractor,
    variables: Variables,
    loader: DocumentLoader,
    index: DashMap<String, PathBuf>,
    documents: FifoCache<PathBuf, CachedDocument>,
    files_indexed: AtomicU64,
    files_skipped: AtomicU64,
    files_without_data: AtomicU64,
    duplicates: AtomicU64,
}

impl InMemoryIndexedCache {
    /// Creates an empty index. Data sources in `config` are not read.
    pub fn new(config: &IndexConfig, variables: Variables) -> Result<Self, IndexError> {
        if config.cache == 0 {
            return Err(IndexError::config(format!(
                "Index '{}': cache capacity must be at least 1",
                config.name
            )));
        }

        Ok(Self {
            name: config.name.clone(),
            extractor: KeyExtractor::new(&config.value, &config.key)?,
            variables,
            loader: DocumentLoader::new(),
            index: DashMap::new(),
            documents: FifoCache::new(config.cache),
            files_indexed: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            files_without_data: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        })
    }

    /// Files whose parsed documents are resident, oldest first.
    pub fn resident_files(&self) -> Vec<PathBuf> {
        self.documents.resident_keys()
    }

    fn index_file(
        &self,
        path: &Path,
        source: &DataSource,
        sink: &dyn DiagnosticSink,
    ) -> Result<FileOutcome, IndexError> {
        let Some(document) = self.loader.load(path, sink)? else {
            return Ok(FileOutcome::default());
        };

        let mut outcome = FileOutcome {
            has_data: true,
            ..FileOutcome::default()
        };
        let mut seen = HashSet::new();

        for item in self.extractor.extract(&document, &self.variables)? {
            let (key, _) = item?;
            if !seen.insert(key.clone()) {
                continue;
            }

            match self.index.insert(key.clone(), path.to_path_buf()) {
                None => outcome.keys_added += 1,
                Some(previous) if previous != path => {
                    outcome.duplicates += 1;
                    if source.duplicate_warning {
                        sink.report(
                            Diagnostic::new(
                                DiagnosticKind::DuplicateKey,
                                Severity::Warning,
                                format!(
                                    "Entries for the key '{}' occur in both '{}' and '{}'. \
                                     The last one loaded will be used.",
                                    key,
                                    previous.display(),
                                    path.display()
                                ),
                            )
                            .with_key(&key)
                            .with_file(path),
                        )?;
                    }
                }
                Some(_) => {}
            }
        }

        debug!("Indexed {} new keys from {}", outcome.keys_added, path.display());
        Ok(outcome)
    }

    fn load_cached(
        &self,
        path: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<CachedDocument, IndexError> {
        match self.loader.load(path, sink)? {
            Some(document) => Ok(CachedDocument::new(
                path,
                document,
                &self.extractor,
                &self.variables,
            )?),
            None => Ok(CachedDocument::empty(path)),
        }
    }
}

impl IndexedCache for InMemoryIndexedCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_documents(
        &self,
        source: &DataSource,
        sink: &dyn DiagnosticSink,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IndexError> {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let discovery = FileFinder::for_source(source)?.discover(&source.base)?;
        for (path, message) in &discovery.errors {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::Io,
                    Severity::Error,
                    format!("Unable to read {}: {}", path.display(), message),
                )
                .with_file(path),
            )?;
        }

        let outcomes = discovery
            .files
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return Err(IndexError::Cancelled);
                }
                self.index_file(path, source, sink)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = IngestReport {
            files_scanned: outcomes.len(),
            files_skipped: discovery.skipped,
            ..IngestReport::default()
        };
        for outcome in &outcomes {
            report.keys_added += outcome.keys_added;
            report.duplicates += outcome.duplicates;
            if !outcome.has_data {
                report.files_without_data += 1;
            }
        }

        self.files_indexed
            .fetch_add(report.files_scanned as u64, Ordering::Relaxed);
        self.files_skipped
            .fetch_add(report.files_skipped as u64, Ordering::Relaxed);
        self.files_without_data
            .fetch_add(report.files_without_data as u64, Ordering::Relaxed);
        self.duplicates
            .fetch_add(report.duplicates as u64, Ordering::Relaxed);

        info!(
            "Index '{}': {} keys added from {} files in {}",
            self.name,
            report.keys_added,
            report.files_scanned,
            source.base.display()
        );
        Ok(report)
    }

    fn lookup(&self, key: &str, sink: &dyn DiagnosticSink) -> Result<Option<Document>, IndexError> {
        let Some(path) = self.file_for(key) else {
            return Ok(None);
        };

        let cached = self
            .documents
            .try_get_or_load(&path, |path| self.load_cached(path, sink))?;
        Ok(cached.fragment(key))
    }

    fn count(&self) -> usize {
        self.index.len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn file_for(&self, key: &str) -> Option<PathBuf> {
        self.index.get(key).map(|entry| entry.value().clone())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.index.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    fn statistics(&self) -> IndexStatistics {
        IndexStatistics {
            name: self.name.clone(),
            keys: self.count(),
            files_indexed: self.files_indexed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_without_data: self.files_without_data.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            cache: self.documents.statistics(),
        }
    }
}
