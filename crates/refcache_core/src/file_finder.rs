use crate::config::DataSource;
use crate::error::IndexError;
use globset::{Glob, GlobMatcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Files found for one data source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Matching files, sorted.
    pub files: Vec<PathBuf>,
    /// Files that matched the glob but were not in the allow-list.
    pub skipped: usize,
    /// Paths the directory walk could not read, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

/// Finds the files of a [`DataSource`].
///
/// The glob is matched against file names only, the way a directory
/// listing filter works (`*.xml`, `System.*.xml`).
pub struct FileFinder {
    glob: GlobMatcher,
    recurse: bool,
    only: Option<HashSet<String>>,
}

impl FileFinder {
    pub fn new(pattern: &str, recurse: bool, only: &[String]) -> Result<Self, IndexError> {
        if pattern.trim().is_empty() {
            return Err(IndexError::config("File glob must not be empty"));
        }
        let glob = Glob::new(pattern)
            .map_err(|e| IndexError::config(format!("Invalid pattern '{}': {}", pattern, e)))?
            .compile_matcher();

        let only = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(|name| name.to_lowercase()).collect())
        };

        Ok(Self {
            glob,
            recurse,
            only,
        })
    }

    pub fn for_source(source: &DataSource) -> Result<Self, IndexError> {
        Self::new(&source.files, source.recurse, &source.only)
    }

    /// Checks a file name against the allow-list, ignoring case.
    ///
    /// Entries may name the file with or without its extension.
    pub fn is_allowed(&self, path: &Path) -> bool {
        let Some(only) = &self.only else {
            return true;
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        only.contains(&name) || only.contains(&stem)
    }

    /// Lists matching files under `base_dir`.
    ///
    /// Symbolic links are followed. A missing base directory, or a glob that
    /// matches nothing in a directory that could be read completely, is a
    /// configuration error. Entries the walk fails on are collected in
    /// [`Discovery::errors`].
    pub fn discover(&self, base_dir: &Path) -> Result<Discovery, IndexError> {
        if !base_dir.is_dir() {
            return Err(IndexError::config(format!(
                "Base directory '{}' does not exist or is not a directory",
                base_dir.display()
            )));
        }

        let max_depth = if self.recurse { usize::MAX } else { 1 };
        let mut discovery = Discovery::default();
        let mut matched = 0usize;

        for entry in WalkDir::new(base_dir)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(base_dir).to_path_buf();
                    discovery.errors.push((path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.glob.is_match(entry.file_name()) {
                continue;
            }
            matched += 1;

            if self.is_allowed(entry.path()) {
                discovery.files.push(entry.into_path());
            } else {
                debug!("Skipping {} (not in allow-list)", entry.path().display());
                discovery.skipped += 1;
            }
        }

        if matched == 0 && discovery.errors.is_empty() {
            return Err(IndexError::config(format!(
                "No files matching '{}' found in '{}'",
                self.glob.glob(),
                base_dir.display()
            )));
        }

        discovery.files.sort();

        info!(
            "Discovered {} files in {} ({} skipped, {} unreadable)",
            discovery.files.len(),
            base_dir.display(),
            discovery.skipped,
            discovery.errors.len()
        );
        Ok(discovery)
    }
}
