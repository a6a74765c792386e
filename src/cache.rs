//! Read-through cache for catalog listings.
//!
//! Handlers never talk to a cache backend directly: they go through [`cached`],
//! which treats every backend failure as a miss so a broken cache only costs
//! a trip to the database.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::AppResult;

/// Prefix shared by every catalog read key.
pub const CATALOG_PREFIX: &str = "catalog:";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value capability with per-entry expiration.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    async fn clear(&self, key: &str) -> Result<(), CacheError>;

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process store on a bounded moka cache.
pub struct MemoryCache {
    inner: Cache<String, Arc<Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .support_invalidation_closures()
                .build(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let Some(entry) = self.inner.get(key).await else {
            return Ok(None);
        };
        if Instant::now() >= entry.expires_at {
            self.inner.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.insert(key.to_owned(), Arc::new(entry)).await;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let prefix = prefix.to_owned();
        self.inner
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub timeout: Duration,
}

/// Cache-aside read: serve `key` from the store, or run `load` and remember the result.
pub async fn cached<T, F, Fut>(
    store: &dyn CacheStore,
    options: CacheOptions,
    key: &str,
    load: F,
) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(options.timeout, store.get(key)).await {
        Ok(Ok(Some(value))) => match serde_json::from_value::<T>(value) {
            Ok(hit) => {
                tracing::debug!(key, "cache hit");
                return Ok(hit);
            }
            Err(err) => tracing::warn!(key, error = %err, "discarding unreadable cache entry"),
        },
        Ok(Ok(None)) => tracing::debug!(key, "cache miss"),
        Ok(Err(err)) => tracing::warn!(key, error = %err, "cache get failed"),
        Err(_) => tracing::warn!(key, "cache get timed out"),
    }

    let fresh = load().await?;

    let stored = match serde_json::to_value(&fresh) {
        Ok(value) => tokio::time::timeout(options.timeout, store.set(key, value, options.ttl))
            .await
            .map_err(|_| CacheError::Unavailable("set timed out".into()))
            .and_then(|r| r),
        Err(err) => Err(CacheError::from(err)),
    };
    if let Err(err) = stored {
        tracing::warn!(key, error = %err, "cache set failed");
    }

    Ok(fresh)
}

/// Drop every cached catalog view, bounded by the cache timeout.
/// Failures are logged, never returned.
pub async fn invalidate_catalog(store: &dyn CacheStore, options: CacheOptions) {
    match tokio::time::timeout(options.timeout, store.clear_prefix(CATALOG_PREFIX)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "catalog cache invalidation failed"),
        Err(_) => tracing::warn!(
            timeout_ms = %options.timeout.as_millis(),
            "catalog cache invalidation timed out"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::AppError;

    const OPTIONS: CacheOptions = CacheOptions {
        ttl: Duration::from_secs(300),
        timeout: Duration::from_millis(250),
    };

    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn clear(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn clear_prefix(&self, _prefix: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
    }

    struct StalledCache;

    #[async_trait]
    impl CacheStore for StalledCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        }
        async fn clear(&self, _key: &str) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        }
        async fn clear_prefix(&self, _prefix: &str) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        }
    }

    async fn load_counted(calls: &AtomicUsize) -> AppResult<Vec<String>> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["a".to_string(), "b".to_string()])
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_within_ttl_skips_loader() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);

        let first = cached(&cache, OPTIONS, "catalog:visible", || load_counted(&calls))
            .await
            .unwrap();
        let second = cached(&cache, OPTIONS, "catalog:visible", || load_counted(&calls))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_triggers_reload() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);

        cached(&cache, OPTIONS, "catalog:visible", || load_counted(&calls))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        cached(&cache, OPTIONS, "catalog:visible", || load_counted(&calls))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        cached(&cache, OPTIONS, "catalog:visible", || load_counted(&calls))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_backend_degrades_to_loader() {
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let items = cached(&BrokenCache, OPTIONS, "catalog:visible", || load_counted(&calls))
                .await
                .unwrap();
            assert_eq!(items.len(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        invalidate_catalog(&BrokenCache, OPTIONS).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_invalidation_gives_up_after_cache_timeout() {
        let started = Instant::now();
        invalidate_catalog(&StalledCache, OPTIONS).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache = MemoryCache::default();
        let result: AppResult<Vec<String>> = cached(&cache, OPTIONS, "catalog:x", || async {
            Err(AppError::not_found("Category"))
        })
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(cache.get("catalog:x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefix_clear_only_touches_catalog_keys() {
        let cache = MemoryCache::default();
        let ttl = Duration::from_secs(60);
        cache.set("catalog:a", Value::from(1), ttl).await.unwrap();
        cache.set("catalog:b", Value::from(2), ttl).await.unwrap();
        cache.set("session:c", Value::from(3), ttl).await.unwrap();

        invalidate_catalog(&cache, OPTIONS).await;

        assert!(cache.get("catalog:a").await.unwrap().is_none());
        assert!(cache.get("catalog:b").await.unwrap().is_none());
        assert_eq!(cache.get("session:c").await.unwrap(), Some(Value::from(3)));
    }
}
