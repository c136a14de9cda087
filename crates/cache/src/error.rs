use thiserror::Error;

/// Errors that can occur when talking to the cache backend.
///
/// These never propagate past the cache layer's public entry points:
/// reads degrade to a miss, invalidations are logged and counted.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis backend returned an error.
    #[error("Cache backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    /// A cached value could not be (de)serialized.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is unreachable or deliberately failing (tests).
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
