//! Build configuration.
//!
//! A configuration declares the indexes to build, the copy commands that
//! consume them, and static variables available to every path expression.
//! It is read from JSON (validated against an embedded schema) or from the
//! XML component shape:
//!
//! ```xml
//! <component>
//!   <variable name="lang" value="en" />
//!   <index name="comments" value="/doc/members/member" key="@name" cache="15">
//!     <data base="comments" files="*.xml" recurse="true" duplicateWarning="false" />
//!   </index>
//!   <copy name="comments" source="summary" target="/document/comments" />
//! </component>
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use jsonschema::Validator;
use refcache_cache::DEFAULT_CAPACITY;
use refcache_xml::{Document, NodeId, Variables, XPath};
use serde::{Deserialize, Serialize};

use crate::diagnostic::MessageLevel;
use crate::error::IndexError;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Index type used when none is configured.
pub const DEFAULT_INDEX_TYPE: &str = "in-memory";

/// Key expression used by copy commands when none is configured.
pub const DEFAULT_COPY_KEY: &str = "$key";

/// Configuration file names searched by [`BuildConfig::discover`], in order.
pub const CONFIG_FILES: &[&str] = &["refcache.json", "refcache.xml"];

/// Configuration for one build run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Indexes to build, in order.
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,

    /// Copy commands, applied in order to each topic.
    #[serde(default)]
    pub copy: Vec<CopyCommandConfig>,

    /// Static variables bound in every path expression.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Directory relative data source paths were resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Configuration for one named index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    /// Unique index name that copy commands refer to.
    pub name: String,

    /// Index implementation id in the registry.
    #[serde(rename = "type", default = "default_index_type")]
    pub index_type: String,

    /// Expression selecting value nodes in each file.
    pub value: String,

    /// Expression selecting the key, relative to a value node.
    pub key: String,

    /// Number of parsed documents kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub cache: usize,

    /// Files to index.
    #[serde(default)]
    pub sources: Vec<DataSource>,
}

/// A set of files contributing to an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Directory to search.
    pub base: PathBuf,

    /// File name glob, e.g. `*.xml`.
    pub files: String,

    /// Whether to search subdirectories.
    #[serde(default)]
    pub recurse: bool,

    /// Whether duplicate keys across files are reported.
    #[serde(default = "default_true")]
    pub duplicate_warning: bool,

    /// If not empty, only files with these names are indexed.
    #[serde(default)]
    pub only: Vec<String>,
}

/// Configuration for one copy-from-index command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyCommandConfig {
    /// Name of the index to look up.
    pub index: String,

    /// Expression selecting what to copy, relative to the found fragment.
    pub source: String,

    /// Expression selecting the insertion point in the target document.
    pub target: String,

    /// Expression computing the lookup key from the target document.
    #[serde(default = "default_copy_key")]
    pub key: String,

    /// Copy source attributes onto the target instead of appending nodes.
    #[serde(default)]
    pub attribute: bool,

    /// Retry a failed lookup with the key lowercased.
    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default)]
    pub missing_entry: MessageLevel,

    #[serde(default)]
    pub missing_source: MessageLevel,

    #[serde(default)]
    pub missing_target: MessageLevel,
}

fn default_index_type() -> String {
    DEFAULT_INDEX_TYPE.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_copy_key() -> String {
    DEFAULT_COPY_KEY.to_string()
}

impl IndexConfig {
    /// Creates an index configuration with default type and capacity.
    pub fn new(name: impl Into<String>, value: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_type: default_index_type(),
            value: value.into(),
            key: key.into(),
            cache: DEFAULT_CAPACITY,
            sources: Vec::new(),
        }
    }

    /// Checks the index for configuration errors.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.name.trim().is_empty() {
            return Err(IndexError::config("Index name must not be empty"));
        }
        if self.cache == 0 {
            return Err(IndexError::config(format!(
                "Index '{}': cache capacity must be at least 1",
                self.name
            )));
        }
        compile(&self.name, "value", &self.value)?;
        compile(&self.name, "key", &self.key)?;
        for source in &self.sources {
            source.validate(&self.name)?;
        }
        Ok(())
    }
}

impl DataSource {
    /// Creates a non-recursive source with duplicate warnings on.
    pub fn new(base: impl Into<PathBuf>, files: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            files: files.into(),
            recurse: false,
            duplicate_warning: true,
            only: Vec::new(),
        }
    }

    fn validate(&self, index: &str) -> Result<(), IndexError> {
        if self.files.trim().is_empty() {
            return Err(IndexError::config(format!(
                "Index '{}': data source file glob must not be empty",
                index
            )));
        }
        if self.base.as_os_str().is_empty() {
            return Err(IndexError::config(format!(
                "Index '{}': data source base directory must not be empty",
                index
            )));
        }
        Ok(())
    }
}

impl CopyCommandConfig {
    /// Creates an element-append command with the default key and levels.
    pub fn new(
        index: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            source: source.into(),
            target: target.into(),
            key: default_copy_key(),
            attribute: false,
            ignore_case: false,
            missing_entry: MessageLevel::Ignore,
            missing_source: MessageLevel::Ignore,
            missing_target: MessageLevel::Ignore,
        }
    }

    fn validate(&self) -> Result<(), IndexError> {
        let label = format!("copy from '{}'", self.index);
        compile(&label, "source", &self.source)?;
        compile(&label, "target", &self.target)?;
        compile(&label, "key", &self.key)?;
        Ok(())
    }
}

fn compile(owner: &str, what: &str, expression: &str) -> Result<XPath, IndexError> {
    if expression.trim().is_empty() {
        return Err(IndexError::config(format!(
            "'{}': {} expression must not be empty",
            owner, what
        )));
    }
    XPath::compile(expression).map_err(|e| {
        IndexError::config(format!("'{}': invalid {} expression: {}", owner, what, e))
    })
}

impl BuildConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the first of [`CONFIG_FILES`] present in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    ///
    /// Files ending in `.xml` are read in the XML component shape, anything
    /// else as JSON. Relative data source directories resolve against the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| IndexError::config(format!("Failed to read config: {}", e)))?;

        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        let mut config = if is_xml {
            Self::from_xml(&content)?
        } else {
            Self::from_json(&content)?
        };

        if let Some(parent) = path.parent() {
            config.resolve_paths(parent);
        }

        Ok(config)
    }

    /// Parses configuration from a JSON string with schema validation.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| IndexError::config(format!("Invalid JSON: {}", e)))?;

        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            let error_msg = format!("{} at {}", e, e.instance_path());
            return Err(IndexError::config(format!(
                "Config validation failed: {}",
                error_msg
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| IndexError::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from the XML component shape.
    pub fn from_xml(xml: &str) -> Result<Self, IndexError> {
        let doc = Document::parse(xml)
            .map_err(|e| IndexError::config(format!("Invalid XML config: {}", e)))?;
        let vars = Variables::new();
        let root = doc.root();

        let mut config = Self::new();

        for node in XPath::compile("//variable")?.select(&doc, root, &vars)? {
            let node = node.node();
            let name = required(&doc, node, "name")?;
            let value = doc.attribute(node, "value").unwrap_or_default();
            config.variables.insert(name, value.to_string());
        }

        let data = XPath::compile("data")?;
        for node in XPath::compile("//index")?.select(&doc, root, &vars)? {
            let node = node.node();
            let mut index = IndexConfig::new(
                required(&doc, node, "name")?,
                required(&doc, node, "value")?,
                required(&doc, node, "key")?,
            );
            if let Some(index_type) = doc.attribute(node, "type") {
                index.index_type = index_type.to_string();
            }
            if let Some(cache) = doc.attribute(node, "cache") {
                index.cache = cache.trim().parse().map_err(|_| {
                    IndexError::config(format!(
                        "Index '{}': invalid cache capacity '{}'",
                        index.name, cache
                    ))
                })?;
            }

            for source in data.select(&doc, node, &vars)? {
                let source = source.node();
                let mut data_source = DataSource::new(
                    required(&doc, source, "base")?,
                    required(&doc, source, "files")?,
                );
                data_source.recurse = flag(&doc, source, "recurse", false)?;
                data_source.duplicate_warning = flag(&doc, source, "duplicateWarning", true)?;
                if let Some(only) = doc.attribute(source, "only") {
                    data_source.only = only
                        .split([';', ','])
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                index.sources.push(data_source);
            }

            config.indexes.push(index);
        }

        for node in XPath::compile("//copy")?.select(&doc, root, &vars)? {
            let node = node.node();
            let index = doc
                .attribute(node, "name")
                .or_else(|| doc.attribute(node, "index"))
                .ok_or_else(|| IndexError::config("<copy> requires a 'name' attribute"))?;
            let mut command = CopyCommandConfig::new(
                index,
                required(&doc, node, "source")?,
                required(&doc, node, "target")?,
            );
            if let Some(key) = doc.attribute(node, "key") {
                command.key = key.to_string();
            }
            command.attribute = flag(&doc, node, "attribute", false)?;
            command.ignore_case = flag(&doc, node, "ignoreCase", false)?;
            command.missing_entry = level(&doc, node, "missing-entry")?;
            command.missing_source = level(&doc, node, "missing-source")?;
            command.missing_target = level(&doc, node, "missing-target")?;
            config.copy.push(command);
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolves relative data source directories against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for source in self.indexes.iter_mut().flat_map(|i| i.sources.iter_mut()) {
            if source.base.is_relative() {
                source.base = base_dir.join(&source.base);
            }
        }
        self.base_dir = Some(base_dir.to_path_buf());
    }

    /// Checks the whole configuration for errors.
    pub fn validate(&self) -> Result<(), IndexError> {
        let mut names = HashSet::new();
        for index in &self.indexes {
            index.validate()?;
            if !names.insert(index.name.as_str()) {
                return Err(IndexError::config(format!(
                    "Duplicate index name '{}'",
                    index.name
                )));
            }
        }

        for command in &self.copy {
            if !names.contains(command.index.as_str()) {
                return Err(IndexError::config(format!(
                    "Copy command refers to unknown index '{}'",
                    command.index
                )));
            }
            command.validate()?;
        }
        Ok(())
    }

    /// Returns the configured index named `name`.
    pub fn index(&self, name: &str) -> Option<&IndexConfig> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// Returns the static variables as an evaluation context.
    pub fn variables(&self) -> Variables {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}

fn required(doc: &Document, node: NodeId, name: &str) -> Result<String, IndexError> {
    let element = doc.name(node).unwrap_or_default();
    match doc.attribute(node, name) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(IndexError::config(format!(
            "<{}> requires a '{}' attribute",
            element, name
        ))),
    }
}

fn flag(doc: &Document, node: NodeId, name: &str, default: bool) -> Result<bool, IndexError> {
    let Some(value) = doc.attribute(node, name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(IndexError::config(format!(
            "Attribute '{}' must be 'true' or 'false', found '{}'",
            name, value
        ))),
    }
}

fn level(doc: &Document, node: NodeId, name: &str) -> Result<MessageLevel, IndexError> {
    let Some(value) = doc.attribute(node, name) else {
        return Ok(MessageLevel::default());
    };
    MessageLevel::parse(value).ok_or_else(|| {
        IndexError::config(format!(
            "Attribute '{}' must be one of ignore, info, warn, error; found '{}'",
            name, value
        ))
    })
}
