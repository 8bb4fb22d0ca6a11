//! Configuration section definitions.

mod cache;
mod encode;
mod formats;
mod serve;

pub use cache::{CacheConfig, default_cache_dir};
pub use encode::{AvifConfig, DEFAULT_QUALITY, EncodeSettings, JxlConfig, WebpConfig};
pub use formats::{InputConfig, OutputConfig};
pub use serve::ServeConfig;
