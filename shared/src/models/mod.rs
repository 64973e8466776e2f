//! Data models
//!
//! Shared between the inventory server and any presentation layer.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are epoch millis.

pub mod customer;
pub mod operation;
pub mod order;
pub mod product;

// Re-exports
pub use customer::*;
pub use operation::*;
pub use order::*;
pub use product::*;
