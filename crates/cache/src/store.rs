//! Cache store trait and the get-or-compute read path.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A key/value cache with per-entry TTL.
///
/// Values are JSON strings; typed access goes through [`get_or_compute`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value, or `None` on a miss or expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a value with the given time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Deletes the given keys. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<()>;
}

/// Reads through the cache, falling back to `compute` on a miss or any
/// backend error.
///
/// The computed value is written back best-effort; a failed write-back is
/// logged and otherwise ignored. Only `compute`'s own error can surface.
pub async fn get_or_compute<T, E, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> std::result::Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                metrics::counter!("cache_hits").increment(1);
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
            }
        },
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(key, error = %e, "cache read failed, falling through");
        }
    }

    metrics::counter!("cache_misses").increment(1);
    let value = compute().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = cache.set(key, raw, ttl).await {
                tracing::warn!(key, error = %e, "cache write-back failed");
            }
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "cache value not serializable");
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCache;

    #[tokio::test]
    async fn computes_on_miss_and_caches() {
        let cache = InMemoryCache::new();

        let value: Result<i64> = get_or_compute(&cache, "k", Duration::from_secs(60), || async {
            Ok(42)
        })
        .await;
        assert_eq!(value.unwrap(), 42);

        // Second read is served from cache: compute would fail if called.
        let value: Result<i64> = get_or_compute(&cache, "k", Duration::from_secs(60), || async {
            panic!("compute called on a warm cache")
        })
        .await;
        assert_eq!(value.unwrap(), 42);
    }

    #[tokio::test]
    async fn backend_error_falls_through_to_compute() {
        let cache = InMemoryCache::new();
        cache.set_fail(true).await;

        let value: Result<i64> = get_or_compute(&cache, "k", Duration::from_secs(60), || async {
            Ok(7)
        })
        .await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn compute_error_surfaces() {
        let cache = InMemoryCache::new();

        let value: std::result::Result<i64, &str> =
            get_or_compute(&cache, "k", Duration::from_secs(60), || async {
                Err("source of truth down")
            })
            .await;
        assert!(value.is_err());
    }
}
