//! Server state
//!
//! Everything a request handler needs, built once at startup and shared by
//! reference: the database pool, the active cache backend and the
//! inventory service composed over both.

use crate::cache::{CachePolicy, CacheStore, MemoryCache, RedisCache};
use crate::core::{CacheBackend, Config};
use crate::db::DbService;
use crate::services::InventoryService;
use shared::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub cache: Arc<dyn CacheStore>,
    /// Backend actually in use, which differs from the configured one after
    /// a Redis fallback
    pub cache_backend: CacheBackend,
    pub inventory: Arc<InventoryService>,
}

impl ServerState {
    /// Open the database, connect the cache and build the service
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(config).await?;
        let (cache, cache_backend) = connect_cache(config).await;
        Ok(Self::with_parts(config.clone(), db, cache, cache_backend))
    }

    pub fn with_parts(
        config: Config,
        db: DbService,
        cache: Arc<dyn CacheStore>,
        cache_backend: CacheBackend,
    ) -> Self {
        let policy = CachePolicy {
            ttl: config.cache_ttl,
            not_found_ttl: config.cache_not_found_ttl,
        };
        let inventory = Arc::new(InventoryService::new(
            &db,
            cache.clone(),
            policy,
            config.request_timeout,
        ));
        Self {
            config,
            db,
            cache,
            cache_backend,
            inventory,
        }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.db.ping().await
    }

    pub async fn shutdown(&self) {
        tracing::info!("Closing database pool");
        self.db.close().await;
    }
}

/// The cache is an accelerator: an unreachable Redis degrades to the
/// in-process backend instead of failing startup.
async fn connect_cache(config: &Config) -> (Arc<dyn CacheStore>, CacheBackend) {
    match config.cache_backend {
        CacheBackend::Memory => {
            tracing::info!("Using in-process product cache");
            (Arc::new(MemoryCache::new()), CacheBackend::Memory)
        }
        CacheBackend::Redis => match RedisCache::connect(&config.redis_url, config.cache_timeout).await
        {
            Ok(cache) => (Arc::new(cache), CacheBackend::Redis),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-process cache");
                (Arc::new(MemoryCache::new()), CacheBackend::Memory)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_initialize_on_disk_with_memory_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: format!("sqlite:{}", dir.path().join("state.db").display()),
            ..Config::default()
        };
        let state = ServerState::initialize(&config).await.unwrap();
        assert_eq!(state.cache_backend, CacheBackend::Memory);
        state.health_check().await.unwrap();
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_memory() {
        let config = Config {
            cache_backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:1".into(),
            cache_timeout: Duration::from_millis(200),
            ..Config::default()
        };
        let (_, backend) = connect_cache(&config).await;
        assert_eq!(backend, CacheBackend::Memory);
    }
}
