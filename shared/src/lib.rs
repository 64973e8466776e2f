//! Shared types for the inventory data service
//!
//! Domain models (products, customers, orders, stock operations), the
//! unified error system consumed by presentation layers, and small
//! utilities used across crates.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
