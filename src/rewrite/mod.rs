//! HTML rewriting: `<img>` → `<picture>` with modern-format `<source>`s.
//!
//! Two collection passes run over the untouched tree, then mutation:
//!
//! 1. every eligible `<img>` outside a `<picture>` is wrapped in a new
//!    `<picture>` and populated;
//! 2. every pre-existing `<picture>` is populated from its direct children.
//!
//! A URL is eligible when it is same-origin, not already virtual, and has
//! an enabled source-format extension. Virtual URLs end in a destination
//! extension and carry the marker, so a second run finds nothing to add.
//!
//! Elements carrying `data-<marker>-ignore` are skipped together with
//! their whole subtree and serialize byte-for-byte unchanged.

mod collect;
mod picture;

use std::sync::Arc;

use crate::debug;
use crate::dom::Document;
use crate::format::FormatRegistry;
use crate::url_codec::{Origin, UrlCodec};

/// What a rewrite pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub pictures_created: usize,
    pub sources_added: usize,
}

impl RewriteStats {
    pub fn is_empty(&self) -> bool {
        self.pictures_created == 0 && self.sources_added == 0
    }
}

#[derive(Debug, Clone)]
pub struct Rewriter {
    codec: UrlCodec,
    registry: Arc<FormatRegistry>,
}

impl Rewriter {
    pub fn new(codec: UrlCodec, registry: Arc<FormatRegistry>) -> Self {
        Self { codec, registry }
    }

    /// Rewrite an HTML document served from `origin`.
    pub fn rewrite_html(&self, html: &str, origin: &Origin) -> String {
        let mut doc = Document::parse(html);
        let stats = self.rewrite(&mut doc, origin);
        if stats.is_empty() {
            return html.to_string();
        }
        debug!(
            "rewrite";
            "{} picture(s) created, {} source(s) added",
            stats.pictures_created,
            stats.sources_added
        );
        doc.serialize()
    }

    /// Rewrite a parsed document in place.
    pub fn rewrite(&self, doc: &mut Document, origin: &Origin) -> RewriteStats {
        let opt_out = self.codec.opt_out_attr();
        let images = collect::eligible_images(doc, opt_out, |src| self.is_rewritable(src, origin));
        let pictures = collect::eligible_pictures(doc, opt_out);

        let mut stats = RewriteStats::default();
        for img in images {
            self.wrap_image(doc, img, origin, &mut stats);
        }
        for picture in pictures {
            self.populate_picture(doc, picture, origin, &mut stats);
        }
        stats
    }

    /// Same-origin, not yet virtual, and an enabled source format.
    fn is_rewritable(&self, url: &str, origin: &Origin) -> bool {
        origin.is_same_origin(url)
            && !self.codec.is_virtual(url)
            && self.registry.is_input_allowed(url)
    }
}
