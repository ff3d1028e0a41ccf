//! # refcache_core
//!
//! Cross-reference index over large sets of XML files.
//!
//! This crate provides:
//! - Document loading with redirect support
//! - Key extraction driven by path expressions
//! - A parallel-built key index backed by a bounded FIFO document cache
//! - The copy-from-index command that merges indexed fragments into topics
//! - Configuration loading and the build context shared by one run
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use refcache_core::{BuildConfig, BuildContext, CopyFromIndexComponent, DiagnosticCollector, IndexRegistry};
//! use refcache_xml::Document;
//!
//! let config = BuildConfig::from_file("refcache.json")?;
//! let mut context = BuildContext::new(Arc::new(DiagnosticCollector::new()));
//! context.build_indexes(&config, &IndexRegistry::default())?;
//!
//! let component = CopyFromIndexComponent::new(&context, &config.copy, config.variables())?;
//! let mut topic = Document::parse("<document><comments /></document>")?;
//! component.apply(&mut topic, "T:System.String")?;
//! ```

mod component;
mod config;
mod context;
mod copy;
mod diagnostic;
mod document;
pub mod eii;
mod error;
mod extractor;
pub mod file_finder;
mod index;
pub mod loader;
mod registry;

pub use component::{CopyFromIndexComponent, KEY_VARIABLE};
pub use config::{
    BuildConfig, CONFIG_FILES, CopyCommandConfig, DEFAULT_COPY_KEY, DEFAULT_INDEX_TYPE,
    DataSource, IndexConfig,
};
pub use context::BuildContext;
pub use copy::{CopyFromIndexCommand, CopyOutcome};
pub use diagnostic::{
    Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, Escalation, MessageLevel,
    Severity,
};
pub use document::CachedDocument;
pub use error::IndexError;
pub use extractor::{KeyExtractor, Keys};
pub use index::{
    CancellationToken, InMemoryIndexedCache, IndexStatistics, IndexedCache, IngestReport,
};
pub use loader::DocumentLoader;
pub use registry::{IndexFactory, IndexRegistry};

pub use refcache_cache::{CacheStatistics, DEFAULT_CAPACITY};
