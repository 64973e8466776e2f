//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity (one row of the stock ledger)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    /// Unit price, always positive
    pub price: f64,
    pub description: String,
    /// On-hand quantity, never negative
    pub quantity: i64,
    pub category: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub quantity: i64,
    pub category: Option<String>,
}

/// Update product payload
///
/// Full-row replace: every field is written, `category: None` clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub quantity: i64,
    pub category: Option<String>,
}

impl From<&Product> for ProductUpdate {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: p.price,
            description: Some(p.description.clone()),
            quantity: p.quantity,
            category: p.category.clone(),
        }
    }
}
