//! Customer Model

use serde::{Deserialize, Serialize};

/// Customer entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    /// E.164 formatted, unique
    pub phone_number: String,
    pub address: String,
    /// Unique
    pub email: String,
    pub registered_at: i64,
}

/// Create customer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreate {
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub email: String,
}

/// Update customer payload (full replace)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub email: String,
}
