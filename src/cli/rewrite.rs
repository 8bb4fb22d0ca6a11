//! `pixshift rewrite`: run the HTML rewriter over one document.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::PixConfig;
use crate::rewrite::Rewriter;
use crate::url_codec::Origin;

/// Rewrite `input` (`-` for stdin) and print the result to stdout.
pub fn rewrite_file(input: &Path, host: &str, config: &PixConfig) -> Result<()> {
    let html = if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?
    };

    let output = rewrite_source(&html, host, config);
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn rewrite_source(html: &str, host: &str, config: &PixConfig) -> String {
    let rewriter = Rewriter::new(config.url_codec(), Arc::new(config.registry()));
    rewriter.rewrite_html(html, &Origin::new("http", host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_rewrite_uses_configured_marker() {
        let config = test_parse_config("marker = \"img\"\n[output]\njxl = false\navif = false");
        let out = rewrite_source("<img src=\"/a.png\">", "localhost", &config);
        assert!(out.contains("srcset=\"/a.png.img.webp\""));
    }

    #[test]
    fn test_rewrite_host_decides_same_origin() {
        let config = test_parse_config("");
        let html = "<img src=\"http://shop.test/a.jpg\">";
        assert_eq!(rewrite_source(html, "localhost", &config), html);
        assert!(rewrite_source(html, "shop.test", &config).contains("a.jpg.pixshift.avif"));
    }
}
