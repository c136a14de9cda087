//! In-memory cache for tests and cache-less deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};
use crate::store::CacheStore;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, (String, Instant)>,
    fail: bool,
}

/// Expiry-aware in-memory cache implementation.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail, simulating a backend outage.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Returns true if a live (unexpired) entry exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }

    /// Number of entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(CacheError::Unavailable("injected failure".to_string()));
        }

        match state.entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                state.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(CacheError::Unavailable("injected failure".to_string()));
        }

        state
            .entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(CacheError::Unavailable("injected failure".to_string()));
        }

        for key in keys {
            state.entries.remove(key);
        }
        Ok(())
    }
}
