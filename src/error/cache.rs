use thiserror::Error;

/// Cache failures. The cache facade downgrades every one of these to a miss
/// or a no-op; they only surface from a backend used directly.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {message}")]
    Backend { message: String },

    #[error("failed to serialize cache payload: {0}")]
    Serialize(String),

    #[error("failed to deserialize cache payload: {0}")]
    Deserialize(String),
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        Self::backend(err.to_string())
    }
}
