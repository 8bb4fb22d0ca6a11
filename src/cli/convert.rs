//! `pixshift convert`: transcode one local image.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::PixConfig;
use crate::core::CancelToken;
use crate::format::FormatKind;
use crate::log;
use crate::transcode::{DiskFetcher, Transcoder};

/// Convert `input` to `format`, writing `<input>.<ext>` unless `output` is given.
pub fn convert_file(
    input: &Path,
    format: FormatKind,
    output: Option<&Path>,
    config: &PixConfig,
) -> Result<PathBuf> {
    let registry = Arc::new(config.registry());
    let destination = registry
        .destinations()
        .iter()
        .find(|f| f.kind == format)
        .copied()
        .ok_or_else(|| anyhow!("`{format}` is not a destination format"))?;

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid input path {}", input.display()))?;
    let dir = match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let url = format!("/{}", utf8_percent_encode(file_name, NON_ALPHANUMERIC));

    let transcoder = Transcoder::new(
        Arc::new(DiskFetcher::new(dir)),
        Arc::clone(&registry),
        config.encode_settings(),
    );
    let bytes = transcoder
        .convert(&url, &destination, &CancelToken::none())
        .with_context(|| format!("failed to convert {}", input.display()))?;

    let output = output.map_or_else(
        || PathBuf::from(format!("{}.{}", input.display(), format.extension())),
        Path::to_path_buf,
    );
    fs::write(&output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;

    log!("convert"; "{} -> {} ({} bytes)", input.display(), output.display(), bytes.len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(path: &Path) {
        RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_convert_default_output_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("my photo.png");
        write_png(&input);

        let output = convert_file(&input, FormatKind::WebP, None, &test_parse_config("")).unwrap();
        assert_eq!(output, dir.path().join("my photo.png.webp"));
        assert_eq!(&fs::read(&output).unwrap()[8..12], b"WEBP");
    }

    #[test]
    fn test_convert_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        let target = dir.path().join("out.webp");
        write_png(&input);

        let output =
            convert_file(&input, FormatKind::WebP, Some(&target), &test_parse_config("")).unwrap();
        assert_eq!(output, target);
        assert!(target.is_file());
    }

    #[test]
    fn test_convert_disabled_format_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_png(&input);

        let config = test_parse_config("[output]\nwebp = false");
        assert!(convert_file(&input, FormatKind::WebP, None, &config).is_err());
        assert!(!dir.path().join("a.png.webp").exists());
    }
}
