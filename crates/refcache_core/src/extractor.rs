//! Key extraction.

use refcache_xml::{Document, NodeId, Value, Variables, XNode, XPath, XPathError};

use crate::error::IndexError;

/// Pairs value nodes with their keys.
///
/// The value expression is evaluated against the document node; the key
/// expression is evaluated with each value node as context. Value nodes
/// without a key are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyExtractor {
    value: XPath,
    key: XPath,
}

impl KeyExtractor {
    pub fn new(value_expression: &str, key_expression: &str) -> Result<Self, IndexError> {
        Ok(Self {
            value: XPath::compile(value_expression)?,
            key: XPath::compile(key_expression)?,
        })
    }

    pub fn value_expression(&self) -> &XPath {
        &self.value
    }

    pub fn key_expression(&self) -> &XPath {
        &self.key
    }

    /// Returns the `(key, value node)` pairs of `document` in document
    /// order.
    ///
    /// The value expression runs eagerly; keys are evaluated as the
    /// iterator advances. Call again for a fresh pass.
    pub fn extract<'a>(
        &'a self,
        document: &'a Document,
        vars: &'a Variables,
    ) -> Result<Keys<'a>, XPathError> {
        let values = self.value.select(document, document.root(), vars)?;
        Ok(Keys {
            extractor: self,
            document,
            vars,
            values: values.into_iter(),
        })
    }

    fn key_of(
        &self,
        document: &Document,
        node: NodeId,
        vars: &Variables,
    ) -> Result<Option<String>, XPathError> {
        let key = match self.key.evaluate(document, node, vars)? {
            Value::Nodes(nodes) => match nodes.first() {
                Some(&first) => document.string_value(first),
                None => return Ok(None),
            },
            other => other.to_string_value(document),
        };
        Ok((!key.is_empty()).then_some(key))
    }
}

/// Iterator returned by [`KeyExtractor::extract`].
pub struct Keys<'a> {
    extractor: &'a KeyExtractor,
    document: &'a Document,
    vars: &'a Variables,
    values: std::vec::IntoIter<XNode>,
}

impl Iterator for Keys<'_> {
    type Item = Result<(String, NodeId), XPathError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Attributes cannot hold a fragment.
            let XNode::Node(node) = self.values.next()? else {
                continue;
            };
            match self.extractor.key_of(self.document, node, self.vars) {
                Ok(Some(key)) => return Some(Ok((key, node))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
