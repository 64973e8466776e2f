//! Shared fixtures for integration tests
#![allow(dead_code)]

use inventory_server::cache::{CachePolicy, MemoryCache};
use inventory_server::db::DbService;
use inventory_server::{CacheBackend, Config, InventoryService, ServerState};
use shared::models::{CustomerCreate, ProductCreate};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Service over a private in-memory database and in-process cache
pub async fn memory_service() -> (InventoryService, MemoryCache) {
    let db = DbService::in_memory().await.expect("in-memory db");
    let cache = MemoryCache::new();
    let service = InventoryService::new(
        &db,
        Arc::new(cache.clone()),
        CachePolicy::default(),
        Duration::from_secs(10),
    );
    (service, cache)
}

/// Full server state on a WAL database file with a multi-connection pool
pub async fn disk_state(dir: &TempDir) -> ServerState {
    let config = Config {
        database_url: format!("sqlite:{}", dir.path().join("inventory.db").display()),
        db_max_connections: 8,
        cache_backend: CacheBackend::Memory,
        request_timeout: Duration::from_secs(30),
        ..Config::default()
    };
    ServerState::initialize(&config).await.expect("server state")
}

pub fn customer(n: u32) -> CustomerCreate {
    CustomerCreate {
        name: format!("Customer {n}"),
        phone_number: format!("+1555000{n:04}"),
        address: format!("{n} Main St"),
        email: format!("customer{n}@example.com"),
    }
}

pub fn product(name: &str, price: f64, quantity: i64, category: Option<&str>) -> ProductCreate {
    ProductCreate {
        name: name.into(),
        price,
        description: None,
        quantity,
        category: category.map(String::from),
    }
}
