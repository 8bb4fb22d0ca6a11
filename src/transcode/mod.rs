//! Transcode pipeline: fetch the original, decode it by its declared
//! content type, re-encode it as the destination format.
//!
//! ```text
//! transcode(original, format)
//!     │
//!     ├── cache hit ───────────────────────────────► bytes
//!     │
//!     └── convert: fetch ─► decode ─► encode ─► put ─► bytes
//!                     (cancel checked between every step)
//! ```
//!
//! Concurrent requests for the same pair may both convert; the result is
//! a pure function of its inputs, so the last cache write wins harmlessly.

mod cache;
mod codec;
mod error;
mod fetch;

pub use cache::{CacheError, CacheKey, CacheStore, DiskCache, MemoryCache, open_store};
pub use codec::CodecError;
pub use error::TranscodeError;
pub use fetch::{DiskFetcher, Fetch, FetchError, Fetched, HttpFetcher};

use std::sync::Arc;

use crate::config::EncodeSettings;
use crate::core::CancelToken;
use crate::format::{FormatRegistry, ImageFormat};
use crate::utils::hash::fingerprint;
use crate::{debug, log};

pub struct Transcoder {
    fetcher: Arc<dyn Fetch>,
    registry: Arc<FormatRegistry>,
    settings: EncodeSettings,
    cache: Option<Arc<dyn CacheStore>>,
}

impl Transcoder {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        registry: Arc<FormatRegistry>,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            fetcher,
            registry,
            settings,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cached conversion. A failed cache write is logged and the
    /// converted bytes are returned regardless.
    pub fn transcode(
        &self,
        original: &str,
        format: &ImageFormat,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TranscodeError> {
        let Some(cache) = &self.cache else {
            return self.convert(original, format, cancel);
        };

        let key = CacheKey::new(original, format);
        if let Some(bytes) = cache.get(&key) {
            debug!("cache"; "hit {} ({})", original, fingerprint(key.as_str()));
            return Ok(bytes);
        }

        let bytes = self.convert(original, format, cancel)?;
        cancel.check()?;
        if let Err(e) = cache.put(&key, &bytes) {
            log!("warning"; "{e}, serving uncached");
        }
        Ok(bytes)
    }

    /// Uncached conversion of `original` into `format`.
    pub fn convert(
        &self,
        original: &str,
        format: &ImageFormat,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TranscodeError> {
        if !self.registry.is_output_allowed(format) {
            return Err(TranscodeError::UnsupportedOutputFormat(
                format.extension().to_string(),
            ));
        }

        let fetched = self.fetcher.fetch(original, cancel)?;
        let source = self
            .registry
            .source_for_content_type(&fetched.content_type)
            .ok_or_else(|| TranscodeError::UnsupportedInputFormat(fetched.content_type.clone()))?;
        cancel.check()?;

        let image = codec::decode(&fetched.bytes, source.kind)?;
        cancel.check()?;

        let encoded = codec::encode(&image, format.kind, &self.settings)?;
        cancel.check()?;

        debug!(
            "transcode";
            "{} ({} bytes) -> {} ({} bytes)",
            original,
            fetched.bytes.len(),
            format.extension(),
            encoded.len()
        );
        Ok(encoded)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{InputConfig, OutputConfig};
    use crate::format::FormatKind;
    use image::{ImageFormat as PixelFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, PixelFormat::Png).unwrap();
        out.into_inner()
    }

    /// Serves one fixed body for every URL and counts calls.
    pub(crate) struct FakeFetcher {
        pub bytes: Vec<u8>,
        pub content_type: String,
        pub calls: AtomicUsize,
    }

    impl FakeFetcher {
        pub(crate) fn png() -> Self {
            Self {
                bytes: sample_png(),
                content_type: "image/png".to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, _url: &str, cancel: &CancelToken) -> Result<Fetched, FetchError> {
            cancel.check()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Fetched {
                bytes: self.bytes.clone(),
                content_type: self.content_type.clone(),
            })
        }
    }

    fn registry(output: OutputConfig) -> Arc<FormatRegistry> {
        Arc::new(FormatRegistry::from_config(&InputConfig::default(), &output))
    }

    fn webp() -> ImageFormat {
        ImageFormat::destination(FormatKind::WebP, true)
    }

    #[test]
    fn test_convert_png_to_webp() {
        let fetcher = Arc::new(FakeFetcher::png());
        let transcoder = Transcoder::new(
            fetcher.clone(),
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        );
        let bytes = transcoder
            .convert("/a.png", &webp(), &CancelToken::none())
            .unwrap();
        assert_eq!(&bytes[8..12], b"WEBP");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_disabled_output_skips_fetch() {
        let fetcher = Arc::new(FakeFetcher::png());
        let transcoder = Transcoder::new(
            fetcher.clone(),
            registry(OutputConfig {
                webp: false,
                ..OutputConfig::default()
            }),
            EncodeSettings::default(),
        );
        let err = transcoder
            .convert("/a.png", &webp(), &CancelToken::none())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::UnsupportedOutputFormat(ext) if ext == "webp"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_content_type_decides_decoder() {
        // URL says .jpg, body and header say png
        let fetcher = Arc::new(FakeFetcher {
            content_type: "image/png; charset=binary".to_string(),
            ..FakeFetcher::png()
        });
        let transcoder = Transcoder::new(
            fetcher,
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        );
        assert!(transcoder.convert("/a.jpg", &webp(), &CancelToken::none()).is_ok());
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let fetcher = Arc::new(FakeFetcher {
            content_type: "image/gif".to_string(),
            ..FakeFetcher::png()
        });
        let transcoder = Transcoder::new(
            fetcher,
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        );
        let err = transcoder
            .convert("/a.gif", &webp(), &CancelToken::none())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::UnsupportedInputFormat(ct) if ct == "image/gif"));
    }

    #[test]
    fn test_disabled_input_rejected() {
        let transcoder = Transcoder::new(
            Arc::new(FakeFetcher::png()),
            Arc::new(FormatRegistry::from_config(
                &InputConfig {
                    png: false,
                    ..InputConfig::default()
                },
                &OutputConfig::default(),
            )),
            EncodeSettings::default(),
        );
        assert!(matches!(
            transcoder.convert("/a.png", &webp(), &CancelToken::none()),
            Err(TranscodeError::UnsupportedInputFormat(_))
        ));
    }

    #[test]
    fn test_cache_hit_skips_fetch() {
        let fetcher = Arc::new(FakeFetcher::png());
        let cache = Arc::new(MemoryCache::new());
        let transcoder = Transcoder::new(
            fetcher.clone(),
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        )
        .with_cache(cache.clone());

        let first = transcoder
            .transcode("/a.png", &webp(), &CancelToken::none())
            .unwrap();
        let second = transcoder
            .transcode("/a.png", &webp(), &CancelToken::none())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    struct FailingCache;

    impl CacheStore for FailingCache {
        fn get(&self, _key: &CacheKey) -> Option<Vec<u8>> {
            None
        }

        fn put(&self, key: &CacheKey, _bytes: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Write {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn test_cache_write_failure_still_serves() {
        let transcoder = Transcoder::new(
            Arc::new(FakeFetcher::png()),
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        )
        .with_cache(Arc::new(FailingCache));
        assert!(transcoder
            .transcode("/a.png", &webp(), &CancelToken::none())
            .is_ok());
    }

    #[test]
    fn test_cancelled_request_writes_nothing() {
        let fetcher = Arc::new(FakeFetcher::png());
        let cache = Arc::new(MemoryCache::new());
        let transcoder = Transcoder::new(
            fetcher.clone(),
            registry(OutputConfig::default()),
            EncodeSettings::default(),
        )
        .with_cache(cache.clone());

        let token = CancelToken::none();
        token.cancel();
        let err = transcoder.transcode("/a.png", &webp(), &token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fetcher.calls(), 0);
        assert!(cache.is_empty());
    }
}
