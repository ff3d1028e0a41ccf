//! XML serialization.

use std::fmt::{self, Write};

use quick_xml::escape::escape;

use crate::tree::NodeKind;
use crate::{Document, NodeId};

impl Document {
    /// Serializes the whole document (without an XML declaration).
    pub fn to_xml(&self) -> String {
        self.outer_xml(self.root())
    }

    /// Serializes `id` including its own markup.
    pub fn outer_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_node(&mut out, id);
        out
    }

    /// Serializes the children of `id`.
    pub fn inner_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            let _ = self.write_node(&mut out, child);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) -> fmt::Result {
        match self.kind(id) {
            NodeKind::Root => {
                for &child in self.children(id) {
                    self.write_node(out, child)?;
                }
            }
            NodeKind::Element { name, attributes } => {
                write!(out, "<{name}")?;
                for attr in attributes {
                    write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()))?;
                }
                if self.children(id).is_empty() {
                    out.push_str(" />");
                } else {
                    out.push('>');
                    for &child in self.children(id) {
                        self.write_node(out, child)?;
                    }
                    write!(out, "</{name}>")?;
                }
            }
            NodeKind::Text(text) => out.push_str(&escape(text.as_str())),
            NodeKind::CData(text) => write!(out, "<![CDATA[{text}]]>")?,
            NodeKind::Comment(text) => write!(out, "<!--{text}-->")?,
        }
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_round_trip_preserves_markup() {
        let source = r#"<doc><member name="M:A.B"><summary>x &amp; y</summary><!--c--></member></doc>"#;
        let doc = Document::parse(source).unwrap();
        assert_snapshot!(doc.to_xml(), @r#"<doc><member name="M:A.B"><summary>x &amp; y</summary><!--c--></member></doc>"#);
    }

    #[test]
    fn test_empty_elements_are_self_closed() {
        let doc = Document::parse("<a><b></b></a>").unwrap();
        assert_snapshot!(doc.to_xml(), @"<a><b /></a>");
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut doc = Document::with_root_element("a");
        let root = doc.document_element().unwrap();
        doc.set_attribute(root, "v", r#"<"&">"#);
        assert_eq!(doc.to_xml(), r#"<a v="&lt;&quot;&amp;&quot;&gt;" />"#);
    }

    #[test]
    fn test_inner_xml() {
        let doc = Document::parse("<a><b>1</b><c/></a>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.inner_xml(root), "<b>1</b><c />");
    }
}
