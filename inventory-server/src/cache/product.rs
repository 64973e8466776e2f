//! Read-through / write-invalidate product cache
//!
//! [`CachedProductRepository`] wraps any [`ProductRepository`] and is one
//! itself. Reads consult the cache first and repopulate on a miss. Writes
//! evict every key that could describe the row (its id key, the unfiltered
//! list and the old/new category lists) both before and after the storage
//! write. Cache failures are logged and never reach the caller.

use super::{CachePolicy, CacheStore, keys};
use crate::db::repository::{ProductRepository, RepoError, RepoResult};
use crate::utils::validation::normalize_category;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Product, ProductCreate, ProductUpdate};
use std::sync::Arc;
use std::time::Duration;

enum Lookup<T> {
    Hit(T),
    /// Cached marker: the ledger had no such row
    NotFound,
    Miss,
}

#[derive(Clone)]
pub struct CachedProductRepository {
    inner: Arc<dyn ProductRepository>,
    cache: Arc<dyn CacheStore>,
    policy: CachePolicy,
}

impl CachedProductRepository {
    pub fn new(
        inner: Arc<dyn ProductRepository>,
        cache: Arc<dyn CacheStore>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Lookup::Miss,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, falling back to storage");
                return Lookup::Miss;
            }
        };
        if bytes == keys::NOT_FOUND_SENTINEL {
            return Lookup::NotFound;
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => Lookup::Hit(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "undecodable cache entry, falling back to storage");
                Lookup::Miss
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.store_raw(key, &bytes, self.policy.ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "cache entry not serializable"),
        }
    }

    async fn store_raw(&self, key: &str, bytes: &[u8], ttl: Duration) {
        if let Err(e) = self.cache.set(key, bytes, ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    async fn evict(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(key = %key, error = %e, "cache invalidation failed");
            }
        }
    }

    /// Cached list read: a miss goes to storage and repopulates
    async fn cached_list<F>(&self, key: &str, load: F) -> RepoResult<Vec<Product>>
    where
        F: std::future::Future<Output = RepoResult<Vec<Product>>> + Send,
    {
        if let Lookup::Hit(products) = self.lookup::<Vec<Product>>(key).await {
            return Ok(products);
        }
        let products = load.await?;
        self.store(key, &products).await;
        Ok(products)
    }

    /// Current row straight from storage, so its category is authoritative.
    ///
    /// `Ok(None)` when the row does not exist; other storage errors are
    /// returned after the id key has been evicted.
    async fn pre_read(&self, id: i64) -> RepoResult<Option<Product>> {
        match self.inner.get_by_id(id).await {
            Ok(product) => Ok(Some(product)),
            Err(RepoError::NotFound(_)) => Ok(None),
            Err(e) => {
                self.evict(&[keys::product(id)]).await;
                Err(e)
            }
        }
    }

    /// Evict cache entries for products changed outside this repository,
    /// e.g. by the order transaction.
    pub async fn invalidate_products(&self, ids: &[i64]) {
        let mut stale = vec![keys::ALL_PRODUCTS.to_string()];
        for &id in ids {
            let category = match self.inner.get_by_id(id).await {
                Ok(product) => product.category,
                Err(e) => {
                    tracing::warn!(product_id = id, error = %e, "category unknown during invalidation");
                    None
                }
            };
            for key in affected_keys(id, [category]) {
                if !stale.contains(&key) {
                    stale.push(key);
                }
            }
        }
        self.evict(&stale).await;
    }
}

/// Keys that may describe product `id`: its own key, the unfiltered list and
/// every listed category
fn affected_keys<I>(id: i64, categories: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut keys = vec![keys::product(id), keys::ALL_PRODUCTS.to_string()];
    for category in categories.into_iter().flatten() {
        let key = keys::category(&category);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

#[async_trait]
impl ProductRepository for CachedProductRepository {
    async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        let mut stale = vec![keys::ALL_PRODUCTS.to_string()];
        if let Some(category) = normalize_category(data.category.clone()) {
            stale.push(keys::category(&category));
        }
        self.evict(&stale).await;

        let result = self.inner.create(data).await;
        if let Ok(product) = &result {
            // a not-found marker may be cached for the freshly assigned id
            stale.push(keys::product(product.product_id));
        }
        self.evict(&stale).await;
        result
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Product> {
        if id <= 0 {
            return self.inner.get_by_id(id).await;
        }
        let key = keys::product(id);
        match self.lookup::<Product>(&key).await {
            Lookup::Hit(product) => return Ok(product),
            Lookup::NotFound => return Err(RepoError::NotFound(format!("product {id} not found"))),
            Lookup::Miss => {}
        }

        match self.inner.get_by_id(id).await {
            Ok(product) => {
                self.store(&key, &product).await;
                Ok(product)
            }
            Err(RepoError::NotFound(msg)) => {
                self.store_raw(&key, keys::NOT_FOUND_SENTINEL, self.policy.not_found_ttl)
                    .await;
                Err(RepoError::NotFound(msg))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_all(&self) -> RepoResult<Vec<Product>> {
        self.cached_list(keys::ALL_PRODUCTS, self.inner.get_all())
            .await
    }

    async fn get_by_category(&self, category: &str) -> RepoResult<Vec<Product>> {
        let label = category.trim();
        if label.is_empty() {
            return self.inner.get_by_category(category).await;
        }
        self.cached_list(&keys::category(label), self.inner.get_by_category(label))
            .await
    }

    async fn update(&self, id: i64, data: ProductUpdate) -> RepoResult<Product> {
        if id <= 0 {
            return self.inner.update(id, data).await;
        }
        let old = self.pre_read(id).await?;
        let stale = affected_keys(
            id,
            [
                old.and_then(|p| p.category),
                normalize_category(data.category.clone()),
            ],
        );

        self.evict(&stale).await;
        let result = self.inner.update(id, data).await;
        self.evict(&stale).await;
        result
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        if id <= 0 {
            return self.inner.delete(id).await;
        }
        let old = self.pre_read(id).await?;
        let stale = affected_keys(id, [old.and_then(|p| p.category)]);

        self.evict(&stale).await;
        let result = self.inner.delete(id).await;
        self.evict(&stale).await;
        result
    }

    async fn update_quantity(&self, id: i64, delta: i64) -> RepoResult<Product> {
        if id <= 0 {
            return self.inner.update_quantity(id, delta).await;
        }
        let old = self.pre_read(id).await?;
        let stale = affected_keys(id, [old.and_then(|p| p.category)]);

        self.evict(&stale).await;
        let result = self.inner.update_quantity(id, delta).await;
        self.evict(&stale).await;
        result
    }
}
