//! Order Repository
//!
//! Owns the order-creation transaction: customer check, one batch stock
//! lookup, total computation, then order, items, guarded decrements and
//! `outgoing` operations, all committed together or not at all.

use super::operation::insert_operation;
use super::{BaseRepository, RepoError, RepoResult};
use crate::utils::money::order_total;
use crate::utils::validation::{validate_id, validate_line_quantity};
use async_trait::async_trait;
use shared::models::{Order, OrderDetail, OrderItem, OrderItemInput, OperationType, OrderStatus};
use shared::util::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create an order atomically, returning the order with its items
    async fn create_order(
        &self,
        customer_id: i64,
        items: Vec<OrderItemInput>,
    ) -> RepoResult<OrderDetail>;
    async fn get_by_id(&self, id: i64) -> RepoResult<Order>;
    /// All orders ordered by id
    async fn get_all(&self) -> RepoResult<Vec<Order>>;
    async fn get_by_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>>;
    async fn get_with_items(&self, id: i64) -> RepoResult<OrderDetail>;
    /// `status` must be one of the lowercase status names
    async fn update_status(&self, id: i64, status: &str) -> RepoResult<Order>;
}

#[derive(Clone)]
pub struct SqliteOrderRepository {
    base: BaseRepository,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }
}

/// Price and on-hand quantity, read once per distinct product
#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    product_id: i64,
    price: f64,
    quantity: i64,
}

fn validate_order_request(customer_id: i64, items: &[OrderItemInput]) -> RepoResult<()> {
    validate_id(customer_id, "customer_id")?;
    if items.is_empty() {
        return Err(RepoError::Validation("order must contain at least one item".into()));
    }
    for item in items {
        validate_id(item.product_id, "product_id")?;
        validate_line_quantity(item.quantity, item.product_id)?;
    }
    Ok(())
}

/// Requested quantity per distinct product, repeated lines summed
fn aggregate_demand(items: &[OrderItemInput]) -> RepoResult<BTreeMap<i64, i64>> {
    let mut demand = BTreeMap::new();
    for item in items {
        let total = demand.entry(item.product_id).or_insert(0_i64);
        *total = total.checked_add(item.quantity).ok_or_else(|| {
            RepoError::Validation(format!("quantity for product {} overflows", item.product_id))
        })?;
    }
    Ok(demand)
}

async fn fetch_stock(
    conn: &mut SqliteConnection,
    product_ids: impl Iterator<Item = i64>,
) -> RepoResult<HashMap<i64, StockRow>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT product_id, price, quantity FROM products WHERE product_id IN (");
    let mut separated = query.separated(", ");
    for id in product_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<StockRow> = query.build_query_as().fetch_all(conn).await?;
    Ok(rows.into_iter().map(|row| (row.product_id, row)).collect())
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create_order(
        &self,
        customer_id: i64,
        items: Vec<OrderItemInput>,
    ) -> RepoResult<OrderDetail> {
        validate_order_request(customer_id, &items)?;
        let demand = aggregate_demand(&items)?;

        let mut tx = self.base.pool().begin_with("BEGIN IMMEDIATE").await?;

        // 1. customer
        let customer: Option<(i64,)> =
            sqlx::query_as("SELECT customer_id FROM customers WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if customer.is_none() {
            return Err(RepoError::NotFound(format!("customer {customer_id} not found")));
        }

        // 2. one lookup for every distinct product
        let stock = fetch_stock(&mut tx, demand.keys().copied()).await?;

        // 3. every product present and sufficient before anything is written
        for (&product_id, &requested) in &demand {
            let row = stock
                .get(&product_id)
                .ok_or_else(|| RepoError::NotFound(format!("product {product_id} not found")))?;
            if requested > row.quantity {
                return Err(RepoError::NotEnoughStock {
                    product_id,
                    available: row.quantity,
                    requested,
                });
            }
        }

        // 4. total from looked-up prices
        let total = order_total(
            items
                .iter()
                .map(|item| (stock[&item.product_id].price, item.quantity)),
        )
        .ok_or_else(|| RepoError::Validation("order total is out of range".into()))?;

        // 5. order header
        let now = now_millis();
        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (customer_id, total_amount, status, created_at) \
             VALUES (?, ?, ?, ?) \
             RETURNING order_id, customer_id, total_amount, status, created_at",
        )
        .bind(customer_id)
        .bind(total)
        .bind(OrderStatus::Created)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // 6. items, decrements, audit trail
        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            let price = stock[&item.product_id].price;

            let order_item = sqlx::query_as::<_, OrderItem>(
                "INSERT INTO order_items (order_id, product_id, quantity, price) \
                 VALUES (?, ?, ?, ?) \
                 RETURNING order_item_id, order_id, product_id, quantity, price",
            )
            .bind(order.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(price)
            .fetch_one(&mut *tx)
            .await?;

            let decremented = sqlx::query(
                "UPDATE products SET quantity = quantity - ?, updated_at = ? \
                 WHERE product_id = ? AND quantity >= ?",
            )
            .bind(item.quantity)
            .bind(now)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
            if decremented.rows_affected() == 0 {
                tracing::warn!(
                    order_id = order.order_id,
                    product_id = item.product_id,
                    "stock decrement matched no row, aborting order"
                );
                return Err(RepoError::Conflict(format!(
                    "stock of product {} changed while the order was being placed",
                    item.product_id
                )));
            }

            insert_operation(
                &mut tx,
                item.product_id,
                Some(order.order_id),
                OperationType::Outgoing,
                -item.quantity,
            )
            .await?;

            order_items.push(order_item);
        }

        // 7. commit
        tx.commit().await?;

        tracing::info!(
            order_id = order.order_id,
            customer_id,
            items = order_items.len(),
            total = order.total_amount,
            "order created"
        );

        Ok(OrderDetail {
            order,
            items: order_items,
        })
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Order> {
        validate_id(id, "order_id")?;
        sqlx::query_as::<_, Order>(
            "SELECT order_id, customer_id, total_amount, status, created_at \
             FROM orders WHERE order_id = ?",
        )
        .bind(id)
        .fetch_optional(self.base.pool())
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("order {id} not found")))
    }

    async fn get_all(&self) -> RepoResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT order_id, customer_id, total_amount, status, created_at \
             FROM orders ORDER BY order_id",
        )
        .fetch_all(self.base.pool())
        .await?;
        Ok(orders)
    }

    async fn get_by_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>> {
        validate_id(customer_id, "customer_id")?;
        let orders = sqlx::query_as::<_, Order>(
            "SELECT order_id, customer_id, total_amount, status, created_at \
             FROM orders WHERE customer_id = ? ORDER BY order_id",
        )
        .bind(customer_id)
        .fetch_all(self.base.pool())
        .await?;
        Ok(orders)
    }

    async fn get_with_items(&self, id: i64) -> RepoResult<OrderDetail> {
        let order = self.get_by_id(id).await?;
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT order_item_id, order_id, product_id, quantity, price \
             FROM order_items WHERE order_id = ? ORDER BY order_item_id",
        )
        .bind(id)
        .fetch_all(self.base.pool())
        .await?;
        Ok(OrderDetail { order, items })
    }

    async fn update_status(&self, id: i64, status: &str) -> RepoResult<Order> {
        validate_id(id, "order_id")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e: shared::models::InvalidOrderStatus| RepoError::Validation(e.to_string()))?;

        sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = ? WHERE order_id = ? \
             RETURNING order_id, customer_id, total_amount, status, created_at",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(self.base.pool())
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("order {id} not found")))
    }
}
