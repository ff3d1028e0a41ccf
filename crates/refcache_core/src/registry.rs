//! Index type registry.

use std::collections::HashMap;
use std::sync::Arc;

use refcache_xml::Variables;

use crate::config::{DEFAULT_INDEX_TYPE, IndexConfig};
use crate::error::IndexError;
use crate::index::{InMemoryIndexedCache, IndexedCache};

/// Builds an empty index from its configuration.
pub type IndexFactory =
    Box<dyn Fn(&IndexConfig, Variables) -> Result<Arc<dyn IndexedCache>, IndexError> + Send + Sync>;

/// Maps index type ids to factories.
///
/// [`IndexRegistry::default`] knows the built-in `"in-memory"` type; other
/// backing stores are added with [`IndexRegistry::register`].
pub struct IndexRegistry {
    factories: HashMap<String, IndexFactory>,
}

impl IndexRegistry {
    /// Creates a registry with no index types.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `id`, replacing any previous one.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&IndexConfig, Variables) -> Result<Arc<dyn IndexedCache>, IndexError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Creates an index of the type named in `config`.
    pub fn create(
        &self,
        config: &IndexConfig,
        variables: Variables,
    ) -> Result<Arc<dyn IndexedCache>, IndexError> {
        let factory = self.factories.get(&config.index_type).ok_or_else(|| {
            IndexError::config(format!(
                "Index '{}' has unknown type '{}' (known: {})",
                config.name,
                config.index_type,
                self.ids().join(", ")
            ))
        })?;
        factory(config, variables)
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DEFAULT_INDEX_TYPE, |config, variables| {
            Ok(Arc::new(InMemoryIndexedCache::new(config, variables)?) as Arc<dyn IndexedCache>)
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_knows_in_memory() {
        let registry = IndexRegistry::default();
        assert_eq!(registry.ids(), vec!["in-memory"]);

        let config = IndexConfig::new("comments", "//member", "@name");
        let index = registry.create(&config, Variables::new()).unwrap();
        assert_eq!(index.name(), "comments");
        assert_eq!(index.count(), 0);
    }

    #[test]
    fn test_unknown_type() {
        let registry = IndexRegistry::default();
        let mut config = IndexConfig::new("comments", "//member", "@name");
        config.index_type = "sqlite".to_string();

        let err = registry.create(&config, Variables::new()).err().unwrap();
        assert!(err.to_string().contains("unknown type 'sqlite'"));
    }

    #[test]
    fn test_register_custom_type() {
        let mut registry = IndexRegistry::empty();
        assert!(!registry.contains("in-memory"));

        registry.register("small", |config, variables| {
            let mut config = config.clone();
            config.cache = 1;
            Ok(Arc::new(InMemoryIndexedCache::new(&config, variables)?) as Arc<dyn IndexedCache>)
        });

        let mut config = IndexConfig::new("comments", "//member", "@name");
        config.index_type = "small".to_string();
        let index = registry.create(&config, Variables::new()).unwrap();
        assert_eq!(index.statistics().cache.capacity, 1);
    }
}
