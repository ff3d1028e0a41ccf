//! Arena-backed XML tree.
//!
//! Every node of a [`Document`] lives in one `Vec` and is addressed by a
//! [`NodeId`]. Nodes keep a parent link, which the path engine needs for the
//! `..` and ancestor axes, and an ordered child list.

/// Index of a node inside its owning [`Document`].
///
/// A `NodeId` is only meaningful for the document that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single attribute of an element, stored with its qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name (`prefix:local` or `local`).
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node. Exactly one per document, always at index 0.
    Root,
    /// An element with its attributes in document order.
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Character data, unescaped.
    Text(String),
    /// A CDATA section.
    CData(String),
    /// A comment.
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owned XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Creates a document whose document element is a fresh element `name`.
    pub fn with_root_element(name: impl Into<String>) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_element(root, name);
        doc
    }

    /// Returns the document node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the outermost element, if any.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Number of nodes allocated in this document, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the payload of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Returns the qualified name of an element.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the element name without its namespace prefix.
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(local_part)
    }

    /// Returns the attributes of an element; empty for any other node.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Looks up an attribute value by qualified name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Sets an attribute, replacing an existing value of the same name.
    ///
    /// Returns `false` (and does nothing) when `id` is not an element.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind else {
            return false;
        };
        let name = name.into();
        let value = value.into();
        match attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute { name, value }),
        }
        true
    }

    /// Returns the XPath string-value of a node.
    ///
    /// For the document node and elements this is the concatenation of all
    /// descendant text and CDATA content.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) | NodeKind::CData(text) | NodeKind::Comment(text) => text.clone(),
            NodeKind::Root | NodeKind::Element { .. } => {
                let mut out = String::new();
                for node in self.descendants(id) {
                    if let NodeKind::Text(text) | NodeKind::CData(text) = self.kind(node) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    /// Iterates the descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Iterates the ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Returns every attached node's position in document order, indexed by
    /// `NodeId`. Detached nodes get `usize::MAX`.
    pub fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        order[0] = 0;
        for (position, node) in self.descendants(self.root()).enumerate() {
            order[node.index()] = position + 1;
        }
        order
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Creates a detached node of any kind except [`NodeKind::Root`].
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        debug_assert!(!matches!(kind, NodeKind::Root));
        self.push(kind)
    }

    /// Attaches a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.index()].parent.is_none());
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Creates an element and appends it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let child = self.create_element(name);
        self.append_child(parent, child);
        child
    }

    /// Creates a text node and appends it to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let child = self.push(NodeKind::Text(text.into()));
        self.append_child(parent, child);
        child
    }

    /// Deep-copies `source_node` from `source` and appends the copy to
    /// `parent`. Returns the id of the copy in `self`.
    ///
    /// Copying a document node copies its children instead and returns
    /// `parent`.
    pub fn import(&mut self, parent: NodeId, source: &Document, source_node: NodeId) -> NodeId {
        if matches!(source.kind(source_node), NodeKind::Root) {
            for &child in source.children(source_node) {
                self.import(parent, source, child);
            }
            return parent;
        }

        let copy = self.push(source.kind(source_node).clone());
        self.append_child(parent, copy);

        let mut pending: Vec<(NodeId, NodeId)> = vec![(source_node, copy)];
        while let Some((from, to)) = pending.pop() {
            for &child in source.children(from) {
                let child_copy = self.push(source.kind(child).clone());
                self.append_child(to, child_copy);
                if !source.children(child).is_empty() {
                    pending.push((child, child_copy));
                }
            }
        }
        copy
    }

    /// Returns a standalone document holding a deep copy of `id`.
    ///
    /// The copy shares nothing with `self`, so callers may mutate either
    /// side freely.
    pub fn extract(&self, id: NodeId) -> Document {
        let mut fragment = Document::new();
        let root = fragment.root();
        fragment.import(root, self, id);
        fragment
    }
}

/// Pre-order iterator over a subtree. See [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
