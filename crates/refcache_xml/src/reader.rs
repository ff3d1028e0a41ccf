//! XML reader built on `quick-xml`.
//!
//! Whitespace is preserved as text nodes inside elements. Whitespace between
//! top-level nodes is dropped, as are the XML declaration, doctype and
//! processing instructions.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::encoding::{Decoder, decode, detect_encoding};
use quick_xml::events::{BytesStart, Event};

use crate::tree::{Attribute, NodeKind};
use crate::{Document, XmlError};

impl Document {
    /// Decodes raw file content and parses it.
    ///
    /// UTF-16 (with or without a byte-order mark) is recognized; anything
    /// else must be UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XmlError> {
        let text = match detect_encoding(bytes) {
            Some((encoding, bom)) => decode(&bytes[bom..], encoding)
                .map_err(|_| XmlError::Encoding(encoding.name().to_string()))?,
            None => Cow::Borrowed(
                std::str::from_utf8(bytes).map_err(|_| XmlError::Encoding("UTF-8".to_string()))?,
            ),
        };
        Self::parse(&text)
    }

    /// Parses XML text into a document.
    ///
    /// A leading byte-order mark is ignored.
    pub fn parse(source: &str) -> Result<Self, XmlError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut document = Document::new();
        let mut stack = vec![document.root()];

        loop {
            let event = reader
                .read_event()
                .map_err(|e| XmlError::malformed(e.to_string(), reader.error_position()))?;
            let offset = reader.buffer_position();

            match event {
                Event::Start(start) => {
                    let parent = current(&stack);
                    check_single_root(&document, parent, offset)?;
                    let kind = element_kind(&start, reader.decoder(), offset)?;
                    let element = document.create_node(kind);
                    document.append_child(parent, element);
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let parent = current(&stack);
                    check_single_root(&document, parent, offset)?;
                    let kind = element_kind(&start, reader.decoder(), offset)?;
                    let element = document.create_node(kind);
                    document.append_child(parent, element);
                }
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(XmlError::malformed("unexpected end tag", offset));
                    }
                    stack.pop();
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::malformed(e.to_string(), offset))?;
                    if stack.len() == 1 {
                        if !value.trim().is_empty() {
                            return Err(XmlError::malformed(
                                "text outside of the root element",
                                offset,
                            ));
                        }
                        continue;
                    }
                    let node = document.create_node(NodeKind::Text(value.into_owned()));
                    document.append_child(current(&stack), node);
                }
                Event::CData(data) => {
                    if stack.len() == 1 {
                        return Err(XmlError::malformed("CDATA outside of the root element", offset));
                    }
                    let value = String::from_utf8_lossy(&data).into_owned();
                    let node = document.create_node(NodeKind::CData(value));
                    document.append_child(current(&stack), node);
                }
                Event::Comment(comment) => {
                    let value = String::from_utf8_lossy(&comment).into_owned();
                    let node = document.create_node(NodeKind::Comment(value));
                    document.append_child(current(&stack), node);
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            return Err(XmlError::malformed(
                "unexpected end of input inside an element",
                reader.buffer_position(),
            ));
        }
        if document.document_element().is_none() {
            return Err(XmlError::MissingRoot);
        }

        Ok(document)
    }
}

fn current(stack: &[crate::NodeId]) -> crate::NodeId {
    stack[stack.len() - 1]
}

fn check_single_root(
    document: &Document,
    parent: crate::NodeId,
    offset: u64,
) -> Result<(), XmlError> {
    if parent == document.root() && document.document_element().is_some() {
        return Err(XmlError::malformed("multiple root elements", offset));
    }
    Ok(())
}

fn element_kind(
    start: &BytesStart<'_>,
    decoder: Decoder,
    offset: u64,
) -> Result<NodeKind, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| XmlError::malformed(e.to_string(), offset))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes().with_checks(true) {
        let attr = attr.map_err(|e| XmlError::malformed(e.to_string(), offset))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| XmlError::malformed(e.to_string(), offset))?
            .to_string();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| XmlError::malformed(e.to_string(), offset))?
            .into_owned();
        attributes.push(Attribute::new(key, value));
    }

    Ok(NodeKind::Element { name, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_simple_document() {
        let doc = Document::parse(
            r#"<?xml version="1.0"?>
<doc><member name="M:A.B"><summary>x</summary></member></doc>"#,
        )
        .unwrap();

        let root = doc.document_element().unwrap();
        assert_eq!(doc.name(root), Some("doc"));
        let member = doc.children(root)[0];
        assert_eq!(doc.attribute(member, "name"), Some("M:A.B"));
        assert_eq!(doc.text_content(member), "x");
    }

    #[test]
    fn test_parse_preserves_whitespace_inside_elements() {
        let doc = Document::parse("<a>\n  <b> t </b>\n</a>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.children(root).len(), 3);
        assert_eq!(doc.text_content(root), "\n   t \n");
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = Document::parse(r#"<a title="x &amp; y">&lt;T&gt;</a>"#).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.attribute(root, "title"), Some("x & y"));
        assert_eq!(doc.text_content(root), "<T>");
    }

    #[test]
    fn test_parse_keeps_cdata_and_comments() {
        let doc = Document::parse("<a><!-- note --><![CDATA[<raw>]]></a>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.kind(doc.children(root)[0]), &NodeKind::Comment(" note ".into()));
        assert_eq!(doc.kind(doc.children(root)[1]), &NodeKind::CData("<raw>".into()));
    }

    #[test]
    fn test_parse_strips_byte_order_mark() {
        let doc = Document::parse("\u{feff}<a/>").unwrap();
        assert!(doc.document_element().is_some());
    }

    #[test]
    fn test_from_bytes_decodes_utf16() {
        let source = "<?xml version=\"1.0\" encoding=\"utf-16\"?><a title=\"caf\u{e9}\">\u{e9}t\u{e9}</a>";
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(source.encode_utf16().flat_map(u16::to_le_bytes));

        let doc = Document::from_bytes(&bytes).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.attribute(root, "title"), Some("caf\u{e9}"));
        assert_eq!(doc.text_content(root), "\u{e9}t\u{e9}");
    }

    #[test]
    fn test_from_bytes_accepts_utf8_with_and_without_bom() {
        assert!(Document::from_bytes(b"<a>x</a>").is_ok());
        assert!(Document::from_bytes(b"\xEF\xBB\xBF<a>x</a>").is_ok());
    }

    #[rstest]
    #[case::latin1_without_declaration(b"<doc>caf\xe9</doc>")]
    #[case::latin1_with_declaration(b"<?xml version=\"1.0\"?><doc>caf\xe9</doc>")]
    fn test_from_bytes_rejects_invalid_utf8(#[case] bytes: &[u8]) {
        assert!(matches!(
            Document::from_bytes(bytes),
            Err(XmlError::Encoding(_))
        ));
    }

    #[rstest]
    #[case::mismatched_end("<a><b></a>")]
    #[case::unclosed("<a><b></b>")]
    #[case::two_roots("<a/><b/>")]
    #[case::text_after_root("<a/>junk")]
    #[case::duplicate_attribute(r#"<a x="1" x="2"/>"#)]
    fn test_parse_rejects_malformed(#[case] source: &str) {
        let result = Document::parse(source);
        assert!(
            matches!(result, Err(XmlError::Malformed { .. })),
            "expected malformed error for {source:?}, got {result:?}"
        );
    }

    #[test]
    fn test_parse_empty_input_has_no_root() {
        assert!(matches!(Document::parse("  "), Err(XmlError::MissingRoot)));
    }
}
