//! Service layer

pub mod inventory;

pub use inventory::{CallContext, InventoryService};
