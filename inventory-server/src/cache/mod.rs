//! Product cache
//!
//! A byte-level [`CacheStore`] abstraction with an in-process and a Redis
//! backend, and the read-through / write-invalidate decorator that keeps
//! product reads coherent with the ledger.

pub mod memory;
pub mod product;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use product::CachedProductRepository;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Minimal key/value contract. A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Entry lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Rows and lists
    pub ttl: Duration,
    /// Not-found markers
    pub not_found_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            not_found_ttl: Duration::from_secs(60),
        }
    }
}

/// Cache key layout
pub mod keys {
    pub const ALL_PRODUCTS: &str = "products:all";

    /// Stored under a product key when the ledger has no such row
    pub const NOT_FOUND_SENTINEL: &[u8] = b"notfound";

    pub fn product(id: i64) -> String {
        format!("product:{id}")
    }

    pub fn category(name: &str) -> String {
        format!("products:category:{name}")
    }
}
