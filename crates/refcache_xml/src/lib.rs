//! # refcache_xml
//!
//! XML document model and path-expression engine for refcache.
//!
//! This crate provides:
//! - An owned, arena-backed XML tree (`Document`, `NodeId`) that can be
//!   queried, cloned piecewise and mutated in place
//! - A whitespace-preserving reader built on `quick-xml`
//! - A compact XPath 1.0 subset (`XPath`) evaluated against a document with a
//!   set of `$variable` bindings (`Variables`)
//!
//! ## Example
//!
//! ```rust
//! use refcache_xml::{Document, Variables, XPath};
//!
//! let doc = Document::parse(r#"<doc><member name="T:A"/></doc>"#).unwrap();
//! let members = XPath::compile("/doc/member").unwrap();
//! let key = XPath::compile("string(@name)").unwrap();
//!
//! let vars = Variables::new();
//! let nodes = members.select(&doc, doc.root(), &vars).unwrap();
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(key.evaluate_string(&doc, nodes[0], &vars).unwrap(), "T:A");
//! ```

mod error;
mod reader;
mod tree;
mod writer;
pub mod xpath;

pub use error::{XPathError, XmlError};
pub use tree::{Attribute, Document, NodeId, NodeKind};
pub use xpath::{Value, Variables, XNode, XPath};
