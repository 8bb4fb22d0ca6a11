//! `<picture>` construction and `<source>` synthesis.

use super::{RewriteStats, Rewriter};
use crate::dom::{Document, NodeId};
use crate::format::ImageFormat;
use crate::url_codec::Origin;

/// Attributes the wrapping `<picture>` does not inherit from its `<img>`.
const PICTURE_SKIP_ATTRS: [&str; 3] = ["src", "alt", "srcset"];

/// Attributes a synthesized `<source>` does not inherit from its template.
const SOURCE_SKIP_ATTRS: [&str; 3] = ["srcset", "type", "src"];

impl Rewriter {
    /// Replace `img` with `<picture><img/></picture>`, then populate it.
    pub(super) fn wrap_image(
        &self,
        doc: &mut Document,
        img: NodeId,
        origin: &Origin,
        stats: &mut RewriteStats,
    ) {
        let Some(el) = doc.element(img) else {
            return;
        };
        let img_attrs = el.attrs().to_vec();
        let picture_attrs = img_attrs
            .iter()
            .filter(|(k, _)| !PICTURE_SKIP_ATTRS.contains(&k.as_str()))
            .cloned()
            .collect();

        let picture = doc.create_element("picture", picture_attrs);
        let new_img = doc.create_element("img", img_attrs);
        doc.append_child(picture, new_img);
        if !doc.replace(img, picture) {
            return;
        }
        stats.pictures_created += 1;

        self.populate_picture(doc, picture, origin, stats);
    }

    /// Add one `<source>` per enabled destination ahead of each candidate.
    ///
    /// Candidates are the direct `<source>` children, or the first direct
    /// `<img>` when there are none.
    pub(super) fn populate_picture(
        &self,
        doc: &mut Document,
        picture: NodeId,
        origin: &Origin,
        stats: &mut RewriteStats,
    ) {
        let candidates = {
            let doc: &Document = doc;
            let opt_out = self.codec.opt_out_attr();
            let usable = |id: NodeId| doc.element(id).is_some_and(|el| !el.has_attr(opt_out));

            let mut candidates: Vec<NodeId> = doc
                .child_elements(picture, "source")
                .filter(|&id| usable(id))
                .collect();
            if candidates.is_empty()
                && let Some(img) = doc.child_elements(picture, "img").next()
                && usable(img)
            {
                candidates.push(img);
            }
            candidates
        };

        for candidate in candidates {
            self.expand_candidate(doc, picture, candidate, origin, stats);
        }
    }

    fn expand_candidate(
        &self,
        doc: &mut Document,
        picture: NodeId,
        candidate: NodeId,
        origin: &Origin,
        stats: &mut RewriteStats,
    ) {
        let Some(el) = doc.element(candidate) else {
            return;
        };
        let is_source = el.is("source");
        let inherited: Vec<(String, String)> = if is_source {
            el.attrs()
                .iter()
                .filter(|(k, _)| !SOURCE_SKIP_ATTRS.contains(&k.as_str()))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let srcsets: Vec<(String, &ImageFormat)> = if let Some(srcset) = el.attr("srcset") {
            self.registry
                .enabled_destinations()
                .filter_map(|format| {
                    self.rewrite_srcset(srcset, format, origin)
                        .map(|rewritten| (rewritten, format))
                })
                .collect()
        } else if let Some(src) = el.attr("src").filter(|_| el.is("img"))
            && self.is_rewritable(src, origin)
        {
            self.registry
                .enabled_destinations()
                .map(|format| (self.codec.encode(src, format), format))
                .collect()
        } else {
            Vec::new()
        };

        for (srcset, format) in srcsets {
            if has_source(doc, picture, &srcset, format.mime()) {
                continue;
            }
            let mut attrs = inherited.clone();
            attrs.push(("srcset".to_string(), srcset));
            attrs.push(("type".to_string(), format.mime().to_string()));

            let source = doc.create_element("source", attrs);
            if doc.insert_before(candidate, source) {
                stats.sources_added += 1;
            }
        }
    }

    /// Rewrite every eligible URL token of a srcset for `format`.
    ///
    /// Candidates are split on `,`, then on whitespace; descriptors and
    /// foreign URLs stay as they are. `None` when nothing was rewritten.
    pub(super) fn rewrite_srcset(
        &self,
        srcset: &str,
        format: &ImageFormat,
        origin: &Origin,
    ) -> Option<String> {
        let mut changed = false;
        let parts: Vec<String> = srcset
            .split(',')
            .map(|part| {
                part.split_whitespace()
                    .map(|token| {
                        if self.is_rewritable(token, origin) {
                            changed = true;
                            self.codec.encode(token, format)
                        } else {
                            token.to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        changed.then(|| parts.join(","))
    }
}

/// Whether `picture` already has a direct `<source>` with this srcset and type.
fn has_source(doc: &Document, picture: NodeId, srcset: &str, mime: &str) -> bool {
    doc.child_elements(picture, "source").any(|id| {
        doc.element(id)
            .is_some_and(|el| el.attr("srcset") == Some(srcset) && el.attr("type") == Some(mime))
    })
}
