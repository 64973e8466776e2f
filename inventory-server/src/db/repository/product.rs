//! Product Repository (stock ledger)

use super::{BaseRepository, RepoError, RepoResult};
use crate::utils::validation::{
    MAX_CATEGORY_LEN, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_QUANTITY, normalize_category,
    validate_id,
    validate_optional_text, validate_price, validate_required_text, validate_stock_quantity,
};
use async_trait::async_trait;
use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::util::now_millis;
use sqlx::SqlitePool;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, data: ProductCreate) -> RepoResult<Product>;
    async fn get_by_id(&self, id: i64) -> RepoResult<Product>;
    /// All products ordered by id
    async fn get_all(&self) -> RepoResult<Vec<Product>>;
    /// Products with exactly this category label, ordered by id
    async fn get_by_category(&self, category: &str) -> RepoResult<Vec<Product>>;
    /// Full-row replace
    async fn update(&self, id: i64, data: ProductUpdate) -> RepoResult<Product>;
    async fn delete(&self, id: i64) -> RepoResult<()>;
    /// Apply a signed stock delta atomically, returning the updated row
    async fn update_quantity(&self, id: i64, delta: i64) -> RepoResult<Product>;
}

#[derive(Clone)]
pub struct SqliteProductRepository {
    base: BaseRepository,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }
}

/// Returns the price as it will be stored
fn validate_fields(
    name: &str,
    price: f64,
    description: &Option<String>,
    quantity: i64,
    category: &Option<String>,
) -> RepoResult<f64> {
    validate_required_text(name, "name", MAX_NAME_LEN)?;
    let price = validate_price(price)?;
    validate_optional_text(description, "description", MAX_DESCRIPTION_LEN)?;
    validate_stock_quantity(quantity)?;
    validate_optional_text(category, "category", MAX_CATEGORY_LEN)?;
    Ok(price)
}

fn not_found(id: i64) -> RepoError {
    RepoError::NotFound(format!("product {id} not found"))
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        let price = validate_fields(
            &data.name,
            data.price,
            &data.description,
            data.quantity,
            &data.category,
        )?;

        let now = now_millis();
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, price, description, quantity, category, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING product_id, name, price, description, quantity, category, created_at, updated_at",
        )
        .bind(data.name.trim())
        .bind(price)
        .bind(data.description.unwrap_or_default())
        .bind(data.quantity)
        .bind(normalize_category(data.category))
        .bind(now)
        .bind(now)
        .fetch_one(self.base.pool())
        .await?;

        tracing::debug!(product_id = product.product_id, "product created");
        Ok(product)
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Product> {
        validate_id(id, "product_id")?;
        sqlx::query_as::<_, Product>(
            "SELECT product_id, name, price, description, quantity, category, created_at, updated_at \
             FROM products WHERE product_id = ?",
        )
        .bind(id)
        .fetch_optional(self.base.pool())
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn get_all(&self) -> RepoResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT product_id, name, price, description, quantity, category, created_at, updated_at \
             FROM products ORDER BY product_id",
        )
        .fetch_all(self.base.pool())
        .await?;
        Ok(products)
    }

    async fn get_by_category(&self, category: &str) -> RepoResult<Vec<Product>> {
        validate_required_text(category, "category", MAX_CATEGORY_LEN)?;
        let products = sqlx::query_as::<_, Product>(
            "SELECT product_id, name, price, description, quantity, category, created_at, updated_at \
             FROM products WHERE category = ? ORDER BY product_id",
        )
        .bind(category.trim())
        .fetch_all(self.base.pool())
        .await?;
        Ok(products)
    }

    async fn update(&self, id: i64, data: ProductUpdate) -> RepoResult<Product> {
        validate_id(id, "product_id")?;
        let price = validate_fields(
            &data.name,
            data.price,
            &data.description,
            data.quantity,
            &data.category,
        )?;

        sqlx::query_as::<_, Product>(
            "UPDATE products SET name = ?, price = ?, description = ?, quantity = ?, category = ?, updated_at = ? \
             WHERE product_id = ? \
             RETURNING product_id, name, price, description, quantity, category, created_at, updated_at",
        )
        .bind(data.name.trim())
        .bind(price)
        .bind(data.description.unwrap_or_default())
        .bind(data.quantity)
        .bind(normalize_category(data.category))
        .bind(now_millis())
        .bind(id)
        .fetch_optional(self.base.pool())
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        validate_id(id, "product_id")?;
        let result = sqlx::query("DELETE FROM products WHERE product_id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Conflict(_) => RepoError::Conflict(format!(
                    "product {id} is referenced by orders or stock operations"
                )),
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn update_quantity(&self, id: i64, delta: i64) -> RepoResult<Product> {
        validate_id(id, "product_id")?;

        // IMMEDIATE takes the write lock up front so the read below cannot go stale
        let mut tx = self.base.pool().begin_with("BEGIN IMMEDIATE").await?;

        let current: Option<(i64,)> =
            sqlx::query_as("SELECT quantity FROM products WHERE product_id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((current,)) = current else {
            return Err(not_found(id));
        };

        let candidate = current
            .checked_add(delta)
            .ok_or_else(|| RepoError::Validation(format!("quantity delta {delta} overflows")))?;
        if candidate < 0 {
            return Err(RepoError::NotEnoughStock {
                product_id: id,
                available: current,
                // i64::MIN has no positive counterpart
                requested: delta.saturating_neg(),
            });
        }
        if candidate > MAX_QUANTITY {
            return Err(RepoError::Validation(format!(
                "quantity of product {id} would exceed {MAX_QUANTITY}"
            )));
        }

        let updated = sqlx::query_as::<_, Product>(
            "UPDATE products SET quantity = quantity + ?, updated_at = ? \
             WHERE product_id = ? AND quantity + ? >= 0 \
             RETURNING product_id, name, price, description, quantity, category, created_at, updated_at",
        )
        .bind(delta)
        .bind(now_millis())
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepoError::Conflict(format!("stock of product {id} changed during update"))
        })?;

        if updated.quantity != candidate {
            // dropping tx rolls the write back
            return Err(RepoError::Database(format!(
                "quantity mismatch for product {id}: expected {candidate}, got {}",
                updated.quantity
            )));
        }

        tx.commit().await?;
        Ok(updated)
    }
}
