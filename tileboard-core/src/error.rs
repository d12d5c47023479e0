use thiserror::Error;

/// Failures reported by a key-value store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors originating from the tile board core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL")]
    InvalidBackgroundUrl,

    #[error("Only images are supported")]
    UnsupportedImageUrl,

    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    #[error("invalid opacity: {0:?} (must be 0..=100)")]
    InvalidOpacity(String),
}

impl CoreError {
    /// Whether this error came from validating user input (shown as a
    /// blocking alert) rather than from an external capability (shown as
    /// a transient toast).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidBackgroundUrl
                | Self::UnsupportedImageUrl
                | Self::InvalidLength(_)
                | Self::InvalidOpacity(_)
        )
    }
}
