//! Stock Operation Model
//!
//! Append-only audit trail of stock movements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum OperationType {
    Incoming,
    Outgoing,
    Adjustment,
    Reserve,
}

impl OperationType {
    pub const ALL: [OperationType; 4] = [
        OperationType::Incoming,
        OperationType::Outgoing,
        OperationType::Adjustment,
        OperationType::Reserve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Incoming => "incoming",
            OperationType::Outgoing => "outgoing",
            OperationType::Adjustment => "adjustment",
            OperationType::Reserve => "reserve",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation type: {0}")]
pub struct InvalidOperationType(pub String);

impl FromStr for OperationType {
    type Err = InvalidOperationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| InvalidOperationType(s.to_string()))
    }
}

/// Operation log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Operation {
    pub operation_id: i64,
    pub product_id: i64,
    pub order_id: Option<i64>,
    pub operation_type: OperationType,
    /// Signed, never zero
    pub change_quant: i64,
    pub created_at: i64,
}

/// Create operation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCreate {
    pub product_id: i64,
    pub order_id: Option<i64>,
    pub operation_type: OperationType,
    pub change_quant: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_parse() {
        assert_eq!(
            "adjustment".parse::<OperationType>(),
            Ok(OperationType::Adjustment)
        );
        assert!("refund".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_operation_serde() {
        let op = OperationCreate {
            product_id: 1,
            order_id: None,
            operation_type: OperationType::Reserve,
            change_quant: -2,
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["operation_type"], "reserve");
        assert!(value["order_id"].is_null());
    }
}
