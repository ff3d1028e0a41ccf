//! Parsed files held by the document cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use refcache_xml::{Document, NodeId, Variables, XPathError};

use crate::extractor::KeyExtractor;

/// One loaded file, decomposed into its key to fragment map.
///
/// The parsed tree is never handed out; [`CachedDocument::fragment`]
/// returns a detached copy that callers are free to modify.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    path: PathBuf,
    document: Document,
    entries: HashMap<String, NodeId>,
}

impl CachedDocument {
    /// A placeholder for a file that yielded no data.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Document::new(),
            entries: HashMap::new(),
        }
    }

    /// Indexes `document` with `extractor`.
    ///
    /// When a key occurs twice in the same file the first occurrence is
    /// kept.
    pub fn new(
        path: impl Into<PathBuf>,
        document: Document,
        extractor: &KeyExtractor,
        vars: &Variables,
    ) -> Result<Self, XPathError> {
        let mut entries = HashMap::new();
        for item in extractor.extract(&document, vars)? {
            let (key, node) = item?;
            entries.entry(key).or_insert(node);
        }
        Ok(Self {
            path: path.into(),
            document,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a standalone copy of the fragment stored under `key`.
    pub fn fragment(&self, key: &str) -> Option<Document> {
        self.entries
            .get(key)
            .map(|&node| self.document.extract(node))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cached(xml: &str) -> CachedDocument {
        let extractor = KeyExtractor::new("//member", "@name").unwrap();
        CachedDocument::new("a.xml", Document::parse(xml).unwrap(), &extractor, &Variables::new())
            .unwrap()
    }

    #[test]
    fn test_fragment_is_detached_copy() {
        let doc = cached(r#"<doc><member name="T:A"><summary>x</summary></member></doc>"#);

        let mut fragment = doc.fragment("T:A").unwrap();
        let member = fragment.document_element().unwrap();
        fragment.set_attribute(member, "name", "changed");

        let again = doc.fragment("T:A").unwrap();
        assert_eq!(again.to_xml(), r#"<member name="T:A"><summary>x</summary></member>"#);
    }

    #[test]
    fn test_first_occurrence_wins_within_file() {
        let doc = cached(
            r#"<doc><member name="T:A"><summary>first</summary></member><member name="T:A"><summary>second</summary></member></doc>"#,
        );

        assert_eq!(doc.len(), 1);
        let fragment = doc.fragment("T:A").unwrap();
        assert_eq!(fragment.text_content(fragment.root()), "first");
    }

    #[test]
    fn test_empty_placeholder() {
        let doc = CachedDocument::empty("gone.xml");
        assert!(doc.is_empty());
        assert_eq!(doc.path(), Path::new("gone.xml"));
        assert!(doc.fragment("T:A").is_none());
    }
}
