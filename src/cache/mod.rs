//! Cache layer
//!
//! In-process cache for hot reads (post-by-slug), backed by moka. Values are
//! stored as serialized JSON so the cache stays agnostic of entity types.
//!
//! The cache is a read accelerator only: slug uniqueness checks and all
//! writes go straight to the database.

use anyhow::{Context, Result};
use moka::future::Cache as MokaCache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Default maximum number of cached entries
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// In-memory cache with per-default TTL
#[derive(Debug, Clone)]
pub struct Cache {
    inner: MokaCache<String, String>,
    default_ttl: Duration,
}

impl Cache {
    /// Create a cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let default_ttl = Duration::from_secs(config.ttl_seconds);
        let inner = MokaCache::builder()
            .max_capacity(DEFAULT_MAX_CAPACITY)
            .time_to_live(default_ttl)
            .build();
        Self { inner, default_ttl }
    }

    /// Get a value from the cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.inner.get(key).await {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .context("Failed to deserialize cached value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Store a value in the cache
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize value")?;
        self.inner.insert(key.to_string(), json).await;
        Ok(())
    }

    /// Remove a value from the cache
    pub async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Default TTL configured for this cache
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Create a shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    Arc::new(Cache::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> Cache {
        Cache::new(&CacheConfig { ttl_seconds: 60 })
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = test_cache();

        cache.set("greeting", &"hello".to_string()).await.unwrap();
        let value: Option<String> = cache.get("greeting").await.unwrap();
        assert_eq!(value.as_deref(), Some("hello"));

        cache.delete("greeting").await;
        let value: Option<String> = cache.get("greeting").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let cache = test_cache();
        let value: Option<i64> = cache.get("absent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Payload {
            id: i64,
            slug: String,
        }

        let cache = test_cache();
        let payload = Payload {
            id: 7,
            slug: "hello-world-123456".to_string(),
        };
        cache.set("post", &payload).await.unwrap();

        let restored: Option<Payload> = cache.get("post").await.unwrap();
        assert_eq!(restored, Some(payload));
    }
}
