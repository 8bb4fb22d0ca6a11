//! Arena-backed HTML document.
//!
//! Nodes live in one `Vec` and are addressed by [`NodeId`]. Each node
//! keeps its parent index and an ordered list of child indices, so
//! "insert before" is a splice on the parent's child list.
//!
//! Parsed nodes record where they sit in the source. Serialization copies
//! the source in order and splices created nodes in at the position of the
//! node they replace or precede, so everything the rewriter did not touch
//! (end tags, comments, text the parser could not place) comes out
//! byte-for-byte identical.

mod parse;
mod scan;
mod serialize;

use crate::utils::html::is_void_element;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The document node.
    pub const ROOT: NodeId = NodeId(0);
}

/// Byte range of a parsed node's own markup: the start tag of an
/// element, or the whole of a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    head_end: usize,
}

impl Span {
    fn new(start: usize, head_end: usize) -> Self {
        Self { start, head_end }
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(Element),
    Text,
}

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn new(name: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs,
        }
    }

    /// Lowercased tag name.
    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Attributes in source order.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
    /// Source position; `None` for created nodes.
    span: Option<Span>,
    /// Source range a created node stands in for after `replace`.
    slot: Option<Span>,
    dirty: bool,
}

impl Node {
    fn new(data: NodeData, span: Option<Span>) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
            dirty: span.is_none(),
            span,
            slot: None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    /// Full input, returned as-is when nothing changed.
    source: String,
}

impl Document {
    /// Parse an HTML document or fragment. Never fails: markup the parser
    /// cannot place is kept as opaque source bytes.
    pub fn parse(html: &str) -> Self {
        parse::parse(html)
    }

    fn with_source(source: &str) -> Self {
        let mut root = Node::new(NodeData::Document, None);
        root.dirty = false;
        Self {
            nodes: vec![root],
            source: source.to_string(),
        }
    }

    /// Render back to HTML.
    pub fn serialize(&self) -> String {
        serialize::serialize(self)
    }

    /// Whether any mutation happened since parsing.
    pub fn is_modified(&self) -> bool {
        self.nodes[NodeId::ROOT.0].dirty
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).as_element()
    }

    /// Whether `id` is an element named `name`.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.is(name))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Direct element children named `name`.
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c, name))
    }

    // ========================================================================
    // mutation
    // ========================================================================

    /// Create a detached element. It renders from its attributes.
    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push_node(Node::new(
            NodeData::Element(Element::new(name, attrs)),
            None,
        ))
    }

    /// Append a detached node as the last child of a created `parent`.
    ///
    /// Parsed elements have no known end position, so appending to one
    /// returns `false` and does nothing; use [`Self::insert_before`].
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[parent.0].span.is_some() || parent == NodeId::ROOT {
            return false;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.mark_dirty(parent);
        true
    }

    /// Insert `node` immediately before `reference` among its siblings.
    ///
    /// Returns `false` (and does nothing) if `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        self.detach(node);
        let Some(pos) = self.position(parent, reference) else {
            return false;
        };
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, node);
        self.mark_dirty(parent);
        true
    }

    /// Put `new` where `old` is; `old` becomes detached.
    ///
    /// `new` takes over the start tag of `old` in the output. Children and
    /// end tag of a replaced parsed element stay in place, so this is meant
    /// for void elements.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        self.detach(new);
        let Some(pos) = self.position(parent, old) else {
            return false;
        };
        self.nodes[parent.0].children[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[new.0].slot = self.nodes[old.0].span.or(self.nodes[old.0].slot);
        self.nodes[old.0].parent = None;
        self.mark_dirty(parent);
        true
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// End of the last parsed node's own markup.
    fn last_offset(&self) -> usize {
        self.nodes
            .iter()
            .rev()
            .find_map(|n| n.span)
            .map_or(0, |span| span.head_end)
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
            self.mark_dirty(parent);
        }
    }

    /// Mark `id` and every ancestor as needing re-rendering.
    fn mark_dirty(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.nodes[node.0].dirty && node != id {
                // ancestors of a dirty node are already dirty
                break;
            }
            self.nodes[node.0].dirty = true;
            current = self.nodes[node.0].parent;
        }
    }
}
