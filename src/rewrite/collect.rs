//! Pre-order collection of rewrite targets.
//!
//! Both passes run before any mutation, so the node lists are stable
//! while the tree changes underneath them.

use crate::dom::{Document, NodeId};

/// Visit every element below `root` in document order, skipping the
/// subtree of any element that carries `opt_out`. The callback receives
/// the node and whether it sits under a `<picture>`.
///
/// `<template>` content is inert and not descended into. Raw text elements
/// (`<script>`, `<textarea>`) never have element children to begin with.
fn walk(doc: &Document, root: NodeId, opt_out: &str, mut visit: impl FnMut(NodeId, bool)) {
    let mut stack: Vec<(NodeId, bool)> = doc
        .children(root)
        .iter()
        .rev()
        .map(|&c| (c, false))
        .collect();

    while let Some((id, in_picture)) = stack.pop() {
        let Some(el) = doc.element(id) else {
            continue;
        };
        if el.has_attr(opt_out) {
            continue;
        }

        visit(id, in_picture);
        if el.is("template") {
            continue;
        }

        let in_picture = in_picture || el.is("picture");
        stack.extend(doc.children(id).iter().rev().map(|&c| (c, in_picture)));
    }
}

/// `<img>` elements outside any `<picture>` whose `src` passes `eligible`.
pub(super) fn eligible_images(
    doc: &Document,
    opt_out: &str,
    eligible: impl Fn(&str) -> bool,
) -> Vec<NodeId> {
    let mut images = Vec::new();
    walk(doc, doc.root(), opt_out, |id, in_picture| {
        if in_picture {
            return;
        }
        let Some(el) = doc.element(id) else { return };
        if el.is("img") && el.attr("src").is_some_and(&eligible) {
            images.push(id);
        }
    });
    images
}

/// Every `<picture>` outside opted-out subtrees, nested ones included.
pub(super) fn eligible_pictures(doc: &Document, opt_out: &str) -> Vec<NodeId> {
    let mut pictures = Vec::new();
    walk(doc, doc.root(), opt_out, |id, _| {
        if doc.is_element(id, "picture") {
            pictures.push(id);
        }
    });
    pictures
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPT_OUT: &str = "data-px-ignore";

    fn srcs(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| doc.element(id)?.attr("src").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_images_in_document_order() {
        let doc = Document::parse(
            "<div><img src=\"1.jpg\"><p><img src=\"2.png\"></p></div><img src=\"3.jpg\">",
        );
        let images = eligible_images(&doc, OPT_OUT, |_| true);
        assert_eq!(srcs(&doc, &images), vec!["1.jpg", "2.png", "3.jpg"]);
    }

    #[test]
    fn test_images_skip_pictures_and_opt_out() {
        let doc = Document::parse(
            "<picture><img src=\"in.jpg\"></picture>\
             <div data-px-ignore><img src=\"ignored.jpg\"></div>\
             <img src=\"self.jpg\" data-px-ignore>\
             <img src=\"skip.gif\">\
             <img src=\"ok.jpg\">",
        );
        let images = eligible_images(&doc, OPT_OUT, |src| src.ends_with(".jpg"));
        assert_eq!(srcs(&doc, &images), vec!["ok.jpg"]);
    }

    #[test]
    fn test_inert_and_raw_text_content_skipped() {
        let doc = Document::parse(
            "<template><img src=\"t.jpg\"></template>\
             <script>var s = '<img src=\"s.jpg\">';</script>\
             <textarea><img src=\"ta.jpg\"></textarea>\
             <noscript><img src=\"n.jpg\"></noscript>\
             <img src=\"ok.jpg\">",
        );
        let images = eligible_images(&doc, OPT_OUT, |_| true);
        assert_eq!(srcs(&doc, &images), vec!["ok.jpg"]);
    }

    #[test]
    fn test_pictures_include_nested() {
        let doc = Document::parse(
            "<picture id=\"outer\"><picture id=\"inner\"><img src=\"a.jpg\"></picture></picture>\
             <picture id=\"off\" data-px-ignore></picture>",
        );
        let ids: Vec<_> = eligible_pictures(&doc, OPT_OUT)
            .iter()
            .filter_map(|&id| doc.element(id)?.attr("id").map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["outer", "inner"]);
    }
}
