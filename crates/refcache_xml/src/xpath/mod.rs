//! Compiled path expressions.
//!
//! Supports the part of XPath 1.0 that build configurations actually use:
//! location paths over the child, descendant, self, parent, ancestor,
//! sibling and attribute axes; predicates; unions; comparisons; string and
//! node-set functions; and `$variable` references resolved from
//! [`Variables`]. Namespace prefixes are matched literally against the
//! qualified names in the document.

mod eval;
mod functions;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::tree::local_part;
use crate::{Document, NodeId, XPathError};

use eval::Evaluator;
use parser::Expr;

/// A node selected by a path expression.
///
/// Attributes are not tree nodes in [`Document`], so they are addressed by
/// their owning element plus the attribute's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XNode {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl XNode {
    /// Returns the tree node, or the owning element for an attribute.
    pub fn node(self) -> NodeId {
        match self {
            Self::Node(id) | Self::Attribute(id, _) => id,
        }
    }

    pub fn is_attribute(self) -> bool {
        matches!(self, Self::Attribute(..))
    }
}

impl From<NodeId> for XNode {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl Document {
    /// Returns the XPath string-value of a selected node.
    pub fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Node(id) => self.text_content(id),
            XNode::Attribute(id, index) => self
                .attributes(id)
                .get(index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
        }
    }

    /// Returns the qualified name of a selected element or attribute.
    pub fn node_name(&self, node: XNode) -> Option<&str> {
        match node {
            XNode::Node(id) => self.name(id),
            XNode::Attribute(id, index) => {
                self.attributes(id).get(index).map(|attr| attr.name.as_str())
            }
        }
    }

    /// Returns the local name of a selected element or attribute.
    pub fn node_local_name(&self, node: XNode) -> Option<&str> {
        self.node_name(node).map(local_part)
    }
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Selected nodes in document order, without duplicates.
    Nodes(Vec<XNode>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// Converts the value to a string following XPath `string()` rules.
    pub fn to_string_value(&self, doc: &Document) -> String {
        match self {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|&node| doc.string_value(node))
                .unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Converts the value to a boolean following XPath `boolean()` rules.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }
}

/// Formats a number the way XPath `string()` does.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Named string bindings for `$variable` references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    bindings: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of `self` with one more binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        vars.extend(iter);
        vars
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Variables {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

/// A compiled path expression.
///
/// Compilation happens once; the same `XPath` can then be evaluated against
/// any number of documents, from any thread, each time with its own
/// [`Variables`].
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Compiles an expression.
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        if source.trim().is_empty() {
            return Err(XPathError::syntax(source, 0, "empty expression"));
        }
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Returns the expression text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression with `context` as the context node.
    pub fn evaluate(
        &self,
        doc: &Document,
        context: impl Into<XNode>,
        vars: &Variables,
    ) -> Result<Value, XPathError> {
        Evaluator::new(doc, vars).evaluate(&self.expr, context.into())
    }

    /// Evaluates the expression and requires a node-set result.
    pub fn select(
        &self,
        doc: &Document,
        context: impl Into<XNode>,
        vars: &Variables,
    ) -> Result<Vec<XNode>, XPathError> {
        match self.evaluate(doc, context, vars)? {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet(self.source.clone())),
        }
    }

    /// Returns the first selected node in document order.
    pub fn select_first(
        &self,
        doc: &Document,
        context: impl Into<XNode>,
        vars: &Variables,
    ) -> Result<Option<XNode>, XPathError> {
        Ok(self.select(doc, context, vars)?.into_iter().next())
    }

    /// Evaluates the expression and converts the result with `string()`.
    pub fn evaluate_string(
        &self,
        doc: &Document,
        context: impl Into<XNode>,
        vars: &Variables,
    ) -> Result<String, XPathError> {
        Ok(self.evaluate(doc, context, vars)?.to_string_value(doc))
    }
}

impl PartialEq for XPath {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl FromStr for XPath {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
