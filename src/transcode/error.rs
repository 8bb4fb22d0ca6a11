use thiserror::Error;

use super::{CodecError, FetchError};
use crate::core::Cancelled;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to fetch original")]
    Fetch(#[from] FetchError),

    #[error("unsupported input format `{0}`")]
    UnsupportedInputFormat(String),

    #[error("unsupported output format `{0}`")]
    UnsupportedOutputFormat(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl TranscodeError {
    /// Whether the failure came from cancellation, at any stage.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_) | Self::Fetch(FetchError::Cancelled(_))
        )
    }
}
