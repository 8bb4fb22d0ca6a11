//! Build a [`Document`] from `tl`'s parse tree.
//!
//! Nodes keep byte offsets into the source instead of copies of it.
//! `tl` borrows every tag and text slice from its input, so an offset is
//! the distance from the start of that input.

use super::{Document, Element, Node, NodeData, NodeId, Span, scan};
use crate::utils::html::{implies_end, parse_attributes, start_tag_end};

pub(super) fn parse(html: &str) -> Document {
    let mut doc = Document::with_source(html);
    let input = scan::tl_input(html);

    // an unparsable document keeps no nodes and serializes verbatim
    let Ok(dom) = tl::parse(&input, tl::ParserOptions::default()) else {
        return doc;
    };

    let mut builder = Builder {
        doc: &mut doc,
        parser: dom.parser(),
        base: input.as_ptr() as usize,
        len: input.len(),
    };
    for handle in dom.children() {
        builder.convert(NodeId::ROOT, *handle);
    }

    doc
}

struct Builder<'d, 'p, 'a> {
    doc: &'d mut Document,
    parser: &'p tl::Parser<'a>,
    base: usize,
    len: usize,
}

impl Builder<'_, '_, '_> {
    fn convert(&mut self, parent: NodeId, handle: tl::NodeHandle) {
        let Some(node) = handle.get(self.parser) else {
            return;
        };

        match node {
            tl::Node::Tag(tag) => {
                let Some(start) = self.offset(tag.raw().as_bytes()) else {
                    return;
                };
                let head = &self.doc.source[start..];
                let head_end = start + start_tag_end(head).unwrap_or(head.len());

                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                let attrs = parse_attributes(attribute_source(&self.doc.source[start..head_end]));
                let id = self.attach(
                    parent,
                    NodeData::Element(Element::new(&name, attrs)),
                    Span::new(start, head_end),
                );

                // a child that closes this element moves, with what
                // follows it, up to the parent
                let mut target = id;
                for child in tag.children().top().iter() {
                    if target == id && self.closes(&name, *child) {
                        target = parent;
                    }
                    self.convert(target, *child);
                }
            }
            tl::Node::Raw(bytes) => {
                let bytes = bytes.as_bytes();
                if let Some(start) = self.offset(bytes) {
                    self.attach(parent, NodeData::Text, Span::new(start, start + bytes.len()));
                }
            }
            // comments are masked before parsing and stay in the gaps
            tl::Node::Comment(_) => {}
        }
    }

    fn closes(&self, open: &str, child: tl::NodeHandle) -> bool {
        child
            .get(self.parser)
            .and_then(tl::Node::as_tag)
            .is_some_and(|tag| implies_end(open, &tag.name().as_utf8_str().to_ascii_lowercase()))
    }

    /// Offset of a `tl` slice in the input. Slices `tl` did not borrow from
    /// the input, and slices overlapping an earlier node, are rejected;
    /// their bytes stay in the surrounding gap.
    fn offset(&self, bytes: &[u8]) -> Option<usize> {
        let start = (bytes.as_ptr() as usize).checked_sub(self.base)?;
        let in_bounds = start + bytes.len() <= self.len;
        let in_order = start >= self.doc.last_offset();
        (in_bounds && in_order && !bytes.is_empty()).then_some(start)
    }

    fn attach(&mut self, parent: NodeId, data: NodeData, span: Span) -> NodeId {
        let mut node = Node::new(data, Some(span));
        node.parent = Some(parent);
        let id = self.doc.push_node(node);
        self.doc.nodes[parent.0].children.push(id);
        id
    }
}

/// The part of `<name attr=...>` between the tag name and the closing `>`.
fn attribute_source(start_tag: &str) -> &str {
    let inner = start_tag
        .strip_prefix('<')
        .unwrap_or(start_tag)
        .trim_end_matches('>');
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    &inner[name_end..]
}
