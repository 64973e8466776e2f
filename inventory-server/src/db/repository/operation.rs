//! Operation Repository
//!
//! Append-only audit trail of stock movements. Rows are never updated or
//! deleted; the order engine appends through [`insert_operation`] inside its
//! own transaction.

use super::{BaseRepository, RepoError, RepoResult};
use crate::utils::validation::validate_id;
use async_trait::async_trait;
use shared::models::{Operation, OperationCreate, OperationType};
use shared::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

#[async_trait]
pub trait OperationRepository: Send + Sync {
    async fn create(&self, data: OperationCreate) -> RepoResult<Operation>;
    /// Entries for a product in id order, empty when none
    async fn get_by_product_id(&self, product_id: i64) -> RepoResult<Vec<Operation>>;
    /// Entries linked to an order in id order, empty when none
    async fn get_by_order_id(&self, order_id: i64) -> RepoResult<Vec<Operation>>;
}

#[derive(Clone)]
pub struct SqliteOperationRepository {
    base: BaseRepository,
}

impl SqliteOperationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }
}

pub(crate) fn validate_operation(data: &OperationCreate) -> RepoResult<()> {
    validate_id(data.product_id, "product_id")?;
    if let Some(order_id) = data.order_id {
        validate_id(order_id, "order_id")?;
    }
    if data.change_quant == 0 {
        return Err(RepoError::Validation("change_quant must not be zero".into()));
    }
    Ok(())
}

/// Append one log entry on an open connection or transaction
pub(crate) async fn insert_operation(
    conn: &mut SqliteConnection,
    product_id: i64,
    order_id: Option<i64>,
    operation_type: OperationType,
    change_quant: i64,
) -> RepoResult<Operation> {
    let operation = sqlx::query_as::<_, Operation>(
        "INSERT INTO operations (product_id, order_id, operation_type, change_quant, created_at) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING operation_id, product_id, order_id, operation_type, change_quant, created_at",
    )
    .bind(product_id)
    .bind(order_id)
    .bind(operation_type)
    .bind(change_quant)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(operation)
}

#[async_trait]
impl OperationRepository for SqliteOperationRepository {
    async fn create(&self, data: OperationCreate) -> RepoResult<Operation> {
        validate_operation(&data)?;

        let mut conn = self.base.pool().acquire().await?;
        insert_operation(
            &mut conn,
            data.product_id,
            data.order_id,
            data.operation_type,
            data.change_quant,
        )
        .await
        .map_err(|e| match e {
            RepoError::Conflict(_) => RepoError::NotFound(match data.order_id {
                Some(order_id) => format!("product {} or order {order_id} not found", data.product_id),
                None => format!("product {} not found", data.product_id),
            }),
            other => other,
        })
    }

    async fn get_by_product_id(&self, product_id: i64) -> RepoResult<Vec<Operation>> {
        validate_id(product_id, "product_id")?;
        let operations = sqlx::query_as::<_, Operation>(
            "SELECT operation_id, product_id, order_id, operation_type, change_quant, created_at \
             FROM operations WHERE product_id = ? ORDER BY operation_id",
        )
        .bind(product_id)
        .fetch_all(self.base.pool())
        .await?;
        Ok(operations)
    }

    async fn get_by_order_id(&self, order_id: i64) -> RepoResult<Vec<Operation>> {
        validate_id(order_id, "order_id")?;
        let operations = sqlx::query_as::<_, Operation>(
            "SELECT operation_id, product_id, order_id, operation_type, change_quant, created_at \
             FROM operations WHERE order_id = ? ORDER BY operation_id",
        )
        .bind(order_id)
        .fetch_all(self.base.pool())
        .await?;
        Ok(operations)
    }
}
