use std::{future::Future, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{
    cache::{CacheOptions, CacheStore, MemoryCache},
    config::AppConfig,
    error::{AppError, AppResult},
    notify::{LogNotifier, Notifier},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub cache: Arc<dyn CacheStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State with the in-process cache and the logging notifier.
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache_capacity));
        Self {
            orm,
            cache,
            notifier: Arc::new(LogNotifier),
            config: Arc::new(config),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: self.config.cache_ttl,
            timeout: self.config.cache_timeout,
        }
    }

    /// Bounds a unit of work by the configured data-store timeout.
    pub async fn timed<T, F>(&self, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.config.db_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = %self.config.db_timeout.as_millis(), "operation timed out");
                Err(AppError::Timeout)
            }
        }
    }
}
