//! Inventory server
//!
//! Stock ledger, order transaction engine, operation log and customer
//! directory over SQLite, with a coherent product cache in front.
//!
//! # Layout
//!
//! ```text
//! inventory-server/src/
//! ├── core/       # Config, ServerState
//! ├── db/         # Pool, migrations, repositories
//! ├── cache/      # CacheStore backends, cached product repository
//! ├── services/   # InventoryService (deadlines, cancellation, invalidation)
//! └── utils/      # Logging, validation, money
//! ```

pub mod cache;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

pub use crate::core::{CacheBackend, Config, ServerState};
pub use services::{CallContext, InventoryService};
