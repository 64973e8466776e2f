//! Redis cache backend
//!
//! One multiplexed [`ConnectionManager`] shared by all request tasks; it
//! reconnects on its own after a dropped connection. Every call is bounded by
//! `op_timeout` so a stalled Redis degrades to cache misses.

use super::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connect and verify with a PING, failing if either exceeds `op_timeout`
    pub async fn connect(url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = bounded(op_timeout, async {
            ConnectionManager::new(client).await.map_err(CacheError::from)
        })
        .await?;

        let cache = Self { conn, op_timeout };
        cache.ping().await?;
        tracing::info!(op_timeout_ms = op_timeout.as_millis() as u64, "Redis cache connected");
        Ok(cache)
    }

    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

async fn bounded<T, F>(limit: Duration, fut: F) -> CacheResult<T>
where
    F: Future<Output = CacheResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CacheError::Timeout(limit))?
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, async move {
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        // Redis expiry has second granularity and rejects zero
        let seconds = ttl.as_secs().max(1);
        bounded(self.op_timeout, async move {
            let _: () = conn.set_ex(key, value, seconds).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, async move {
            let _: () = conn.del(key).await?;
            Ok(())
        })
        .await
    }
}
