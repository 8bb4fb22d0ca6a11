//! Render a [`Document`] back to HTML.
//!
//! A single cursor walks the source front to back. Parsed nodes are never
//! re-rendered: the bytes up to the next point of change are copied as
//! they are. Created nodes are rendered from their attributes at the
//! source position of the node they replace, or of the sibling they were
//! inserted before.

use super::{Document, Element, NodeData, NodeId};
use crate::utils::html::escape_attr;

pub(super) fn serialize(doc: &Document) -> String {
    if !doc.is_modified() {
        return doc.source.clone();
    }

    let mut writer = Writer {
        doc,
        out: String::with_capacity(doc.source.len() + 256),
        cursor: 0,
    };
    writer.children(NodeId::ROOT);
    writer.copy_to(doc.source.len());
    writer.out
}

struct Writer<'a> {
    doc: &'a Document,
    out: String,
    cursor: usize,
}

impl Writer<'_> {
    /// Copy source bytes up to `pos`.
    fn copy_to(&mut self, pos: usize) {
        if pos > self.cursor {
            self.out.push_str(&self.doc.source[self.cursor..pos]);
            self.cursor = pos;
        }
    }

    fn children(&mut self, id: NodeId) {
        let doc = self.doc;
        let children = doc.children(id);
        for (i, &child) in children.iter().enumerate() {
            let node = doc.node(child);

            if let Some(span) = node.span {
                // clean subtrees are copied by the next `copy_to`
                if node.dirty {
                    self.copy_to(span.head_end);
                    self.children(child);
                }
                continue;
            }

            match node.slot {
                Some(slot) => {
                    self.copy_to(slot.start);
                    render(doc, child, &mut self.out);
                    self.cursor = self.cursor.max(slot.head_end);
                }
                None => {
                    if let Some(anchor) = self.anchor(&children[i + 1..]) {
                        self.copy_to(anchor);
                    }
                    render(doc, child, &mut self.out);
                }
            }
        }
    }

    /// Source position of the first following sibling that has one.
    fn anchor(&self, siblings: &[NodeId]) -> Option<usize> {
        siblings.iter().find_map(|&s| {
            let node = self.doc.node(s);
            node.span.or(node.slot).map(|span| span.start)
        })
    }
}

/// Render a created node and its subtree.
fn render(doc: &Document, id: NodeId, out: &mut String) {
    let node = doc.node(id);
    match (&node.data, node.span) {
        (_, Some(span)) => out.push_str(&doc.source[span.start..span.head_end]),
        (NodeData::Element(el), None) => {
            write_start_tag(el, out);
            for &child in doc.children(id) {
                render(doc, child, out);
            }
            if !el.is_void() {
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
        (NodeData::Document | NodeData::Text, None) => {}
    }
}

fn write_start_tag(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push_str(if el.is_void() { "/>" } else { ">" });
}
