//! Redis-backed cache store.

use std::time::Duration;

use async_trait::async_trait;
use ::redis::AsyncCommands;

use crate::error::Result;
use crate::store::CacheStore;

/// Cache store backed by Redis.
///
/// Holds a `redis::Client`; each operation opens a multiplexed async
/// connection, so the store is cheap to clone and share.
#[derive(Clone)]
pub struct RedisCache {
    client: ::redis::Client,
}

impl RedisCache {
    /// Creates a new Redis cache from a connection string.
    pub fn new(connection_string: &str) -> Result<Self> {
        let client = ::redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }
}
