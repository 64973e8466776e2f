//! Repository Module
//!
//! One async trait per entity, each implemented once over the SQLite pool.
//! All field validation happens before the first query.

pub mod customer;
pub mod operation;
pub mod order;
pub mod product;

// Re-exports
pub use customer::{CustomerRepository, SqliteCustomerRepository};
pub use operation::{OperationRepository, SqliteOperationRepository};
pub use order::{OrderRepository, SqliteOrderRepository};
pub use product::{ProductRepository, SqliteProductRepository};

use shared::error::{AppError, ErrorCode};
use sqlx::SqlitePool;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Insufficient stock, the invalid-input class that names the product
    #[error("Not enough stock for product {product_id}: available {available}, requested {requested}")]
    NotEnoughStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// The row changed underneath us, or is still referenced elsewhere
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("record not found".into()),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => RepoError::Duplicate(db_err.message().to_string()),
                ErrorKind::ForeignKeyViolation => {
                    RepoError::Conflict(db_err.message().to_string())
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    RepoError::Validation(db_err.message().to_string())
                }
                _ => RepoError::Database(err.to_string()),
            },
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Duplicate(msg) => AppError::already_exists(msg),
            RepoError::Conflict(msg) => AppError::conflict(msg),
            RepoError::NotEnoughStock {
                product_id,
                available,
                requested,
            } => AppError::with_message(
                ErrorCode::ProductOutOfStock,
                format!(
                    "Not enough stock for product {product_id}: available {available}, requested {requested}"
                ),
            )
            .with_detail("product_id", product_id)
            .with_detail("available", available)
            .with_detail("requested", requested),
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                AppError::database("Database error")
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with pool reference
#[derive(Clone)]
pub struct BaseRepository {
    pool: SqlitePool,
}

impl BaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::http::StatusCode;

    #[test]
    fn test_repo_error_to_app_error_status() {
        let cases = [
            (RepoError::NotFound("product 1".into()), StatusCode::NOT_FOUND),
            (RepoError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                RepoError::NotEnoughStock {
                    product_id: 1,
                    available: 3,
                    requested: 5,
                },
                StatusCode::BAD_REQUEST,
            ),
            (RepoError::Duplicate("email".into()), StatusCode::CONFLICT),
            (RepoError::Conflict("stock".into()), StatusCode::CONFLICT),
            (
                RepoError::Database("disk I/O error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (repo_err, status) in cases {
            assert_eq!(AppError::from(repo_err).http_status(), status);
        }
    }

    #[test]
    fn test_database_error_message_not_leaked() {
        let app: AppError = RepoError::Database("near \"SELEC\": syntax error".into()).into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
        assert!(!app.message.contains("SELEC"));
    }

    #[test]
    fn test_not_enough_stock_details() {
        let app: AppError = RepoError::NotEnoughStock {
            product_id: 7,
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(app.code, ErrorCode::ProductOutOfStock);
        assert!(app.message.contains("product 7"));
        let details = app.details.unwrap();
        assert_eq!(details["available"], 3);
        assert_eq!(details["requested"], 5);
    }

    #[tokio::test]
    async fn test_sqlx_error_classification() {
        let db = DbService::in_memory().await.unwrap();

        let check = sqlx::query(
            "INSERT INTO products (name, price, quantity, created_at, updated_at) VALUES ('x', -1, 0, 0, 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap_err();
        assert!(matches!(RepoError::from(check), RepoError::Validation(_)));

        let fk = sqlx::query(
            "INSERT INTO orders (customer_id, total_amount, status, created_at) VALUES (999, 1, 'created', 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap_err();
        assert!(matches!(RepoError::from(fk), RepoError::Conflict(_)));

        let missing = sqlx::query("SELECT 1 FROM products WHERE product_id = 1")
            .fetch_one(&db.pool)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(RepoError::from(missing), RepoError::NotFound(_)));
    }
}
