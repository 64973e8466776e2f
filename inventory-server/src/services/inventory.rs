//! Inventory service
//!
//! Composes the repositories behind one API that a transport layer can call.
//! Every operation runs under a [`CallContext`]: it fails with
//! `TimeoutError` past the deadline and `Cancelled` once the token fires,
//! dropping any in-flight transaction (which rolls it back). Orders bypass
//! the product cache, so the service evicts every product an order touched.

use crate::cache::{CachePolicy, CacheStore, CachedProductRepository};
use crate::db::DbService;
use crate::db::repository::{
    CustomerRepository, OperationRepository, OrderRepository, ProductRepository, RepoResult,
    SqliteCustomerRepository, SqliteOperationRepository, SqliteOrderRepository,
    SqliteProductRepository,
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Customer, CustomerCreate, CustomerUpdate, Operation, OperationCreate, Order, OrderDetail,
    OrderItemInput, Product, ProductCreate, ProductUpdate,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call cancellation and deadline
#[derive(Debug, Clone)]
pub struct CallContext {
    pub cancel: CancellationToken,
    /// Tightens the service's own request timeout, never loosens it
    pub deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }
}

pub struct InventoryService {
    products: CachedProductRepository,
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    operations: Arc<dyn OperationRepository>,
    request_timeout: Duration,
}

impl InventoryService {
    /// SQLite repositories with a cached product ledger
    pub fn new(
        db: &DbService,
        cache: Arc<dyn CacheStore>,
        policy: CachePolicy,
        request_timeout: Duration,
    ) -> Self {
        let ledger: Arc<dyn ProductRepository> =
            Arc::new(SqliteProductRepository::new(db.pool.clone()));
        Self::from_parts(
            CachedProductRepository::new(ledger, cache, policy),
            Arc::new(SqliteCustomerRepository::new(db.pool.clone())),
            Arc::new(SqliteOrderRepository::new(db.pool.clone())),
            Arc::new(SqliteOperationRepository::new(db.pool.clone())),
            request_timeout,
        )
    }

    pub fn from_parts(
        products: CachedProductRepository,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        operations: Arc<dyn OperationRepository>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            products,
            customers,
            orders,
            operations,
            request_timeout,
        }
    }

    async fn run<T, F>(&self, ctx: &CallContext, op: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        let own = Instant::now() + self.request_timeout;
        let deadline = ctx.deadline.map_or(own, |d| d.min(own));

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::info!(op, "operation cancelled");
                Err(AppError::with_message(ErrorCode::Cancelled, format!("{op} cancelled")))
            }
            result = tokio::time::timeout_at(deadline, fut) => match result {
                Ok(result) => result.map_err(AppError::from),
                Err(_) => {
                    tracing::warn!(op, "operation exceeded its deadline");
                    Err(AppError::with_message(ErrorCode::TimeoutError, format!("{op} timed out")))
                }
            },
        }
    }

    // ========== Orders ==========

    /// Place an order, then evict every touched product from the cache.
    ///
    /// Eviction also runs on timeout or cancellation since the commit may
    /// have landed before the call was abandoned.
    pub async fn create_order(
        &self,
        ctx: &CallContext,
        customer_id: i64,
        items: Vec<OrderItemInput>,
    ) -> AppResult<OrderDetail> {
        let touched: Vec<i64> = items
            .iter()
            .map(|item| item.product_id)
            .filter(|&id| id > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let result = self
            .run(ctx, "create_order", self.orders.create_order(customer_id, items))
            .await;

        let outcome_uncertain = matches!(
            &result,
            Err(e) if matches!(e.code, ErrorCode::TimeoutError | ErrorCode::Cancelled)
        );
        if result.is_ok() || outcome_uncertain {
            self.products.invalidate_products(&touched).await;
        }
        result
    }

    pub async fn get_order(&self, ctx: &CallContext, id: i64) -> AppResult<Order> {
        self.run(ctx, "get_order", self.orders.get_by_id(id)).await
    }

    pub async fn list_orders(&self, ctx: &CallContext) -> AppResult<Vec<Order>> {
        self.run(ctx, "list_orders", self.orders.get_all()).await
    }

    pub async fn list_customer_orders(
        &self,
        ctx: &CallContext,
        customer_id: i64,
    ) -> AppResult<Vec<Order>> {
        self.run(
            ctx,
            "list_customer_orders",
            self.orders.get_by_customer(customer_id),
        )
        .await
    }

    pub async fn get_order_with_items(&self, ctx: &CallContext, id: i64) -> AppResult<OrderDetail> {
        self.run(ctx, "get_order_with_items", self.orders.get_with_items(id))
            .await
    }

    pub async fn update_order_status(
        &self,
        ctx: &CallContext,
        id: i64,
        status: &str,
    ) -> AppResult<Order> {
        self.run(
            ctx,
            "update_order_status",
            self.orders.update_status(id, status),
        )
        .await
    }

    // ========== Products ==========

    pub async fn create_product(&self, ctx: &CallContext, data: ProductCreate) -> AppResult<Product> {
        self.run(ctx, "create_product", self.products.create(data)).await
    }

    pub async fn get_product(&self, ctx: &CallContext, id: i64) -> AppResult<Product> {
        self.run(ctx, "get_product", self.products.get_by_id(id)).await
    }

    pub async fn list_products(&self, ctx: &CallContext) -> AppResult<Vec<Product>> {
        self.run(ctx, "list_products", self.products.get_all()).await
    }

    pub async fn list_products_by_category(
        &self,
        ctx: &CallContext,
        category: &str,
    ) -> AppResult<Vec<Product>> {
        self.run(
            ctx,
            "list_products_by_category",
            self.products.get_by_category(category),
        )
        .await
    }

    pub async fn update_product(
        &self,
        ctx: &CallContext,
        id: i64,
        data: ProductUpdate,
    ) -> AppResult<Product> {
        self.run(ctx, "update_product", self.products.update(id, data))
            .await
    }

    pub async fn delete_product(&self, ctx: &CallContext, id: i64) -> AppResult<()> {
        self.run(ctx, "delete_product", self.products.delete(id)).await
    }

    /// Signed stock change on one product
    pub async fn adjust_stock(&self, ctx: &CallContext, id: i64, delta: i64) -> AppResult<Product> {
        self.run(ctx, "adjust_stock", self.products.update_quantity(id, delta))
            .await
    }

    // ========== Customers ==========

    pub async fn create_customer(
        &self,
        ctx: &CallContext,
        data: CustomerCreate,
    ) -> AppResult<Customer> {
        self.run(ctx, "create_customer", self.customers.create(data))
            .await
    }

    pub async fn get_customer(&self, ctx: &CallContext, id: i64) -> AppResult<Customer> {
        self.run(ctx, "get_customer", self.customers.get_by_id(id)).await
    }

    pub async fn list_customers(&self, ctx: &CallContext) -> AppResult<Vec<Customer>> {
        self.run(ctx, "list_customers", self.customers.get_all()).await
    }

    pub async fn update_customer(
        &self,
        ctx: &CallContext,
        id: i64,
        data: CustomerUpdate,
    ) -> AppResult<Customer> {
        self.run(ctx, "update_customer", self.customers.update(id, data))
            .await
    }

    pub async fn delete_customer(&self, ctx: &CallContext, id: i64) -> AppResult<()> {
        self.run(ctx, "delete_customer", self.customers.delete(id)).await
    }

    pub async fn find_customer_by_email(
        &self,
        ctx: &CallContext,
        email: &str,
    ) -> AppResult<Customer> {
        self.run(
            ctx,
            "find_customer_by_email",
            self.customers.get_by_email(email),
        )
        .await
    }

    pub async fn find_customer_by_phone(
        &self,
        ctx: &CallContext,
        phone_number: &str,
    ) -> AppResult<Customer> {
        self.run(
            ctx,
            "find_customer_by_phone",
            self.customers.get_by_phone(phone_number),
        )
        .await
    }

    // ========== Operation log ==========

    pub async fn record_operation(
        &self,
        ctx: &CallContext,
        data: OperationCreate,
    ) -> AppResult<Operation> {
        self.run(ctx, "record_operation", self.operations.create(data))
            .await
    }

    pub async fn product_operations(
        &self,
        ctx: &CallContext,
        product_id: i64,
    ) -> AppResult<Vec<Operation>> {
        self.run(
            ctx,
            "product_operations",
            self.operations.get_by_product_id(product_id),
        )
        .await
    }

    pub async fn order_operations(
        &self,
        ctx: &CallContext,
        order_id: i64,
    ) -> AppResult<Vec<Operation>> {
        self.run(
            ctx,
            "order_operations",
            self.operations.get_by_order_id(order_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use async_trait::async_trait;
    use shared::models::OrderStatus;

    async fn service() -> (InventoryService, DbService) {
        let db = DbService::in_memory().await.unwrap();
        let service = InventoryService::new(
            &db,
            Arc::new(MemoryCache::new()),
            CachePolicy::default(),
            Duration::from_secs(5),
        );
        (service, db)
    }

    async fn seed(service: &InventoryService, ctx: &CallContext) -> (i64, i64) {
        let customer = service
            .create_customer(
                ctx,
                CustomerCreate {
                    name: "Maria".into(),
                    phone_number: "+34600111222".into(),
                    address: "Madrid".into(),
                    email: "maria@example.com".into(),
                },
            )
            .await
            .unwrap();
        let product = service
            .create_product(
                ctx,
                ProductCreate {
                    name: "Lamp".into(),
                    price: 25.0,
                    description: None,
                    quantity: 4,
                    category: Some("lighting".into()),
                },
            )
            .await
            .unwrap();
        (customer.customer_id, product.product_id)
    }

    #[tokio::test]
    async fn test_order_evicts_cached_product_views() {
        let (service, _db) = service().await;
        let ctx = CallContext::new();
        let (customer_id, product_id) = seed(&service, &ctx).await;

        // warm the cache
        assert_eq!(service.get_product(&ctx, product_id).await.unwrap().quantity, 4);
        assert_eq!(service.list_products(&ctx).await.unwrap()[0].quantity, 4);
        assert_eq!(
            service
                .list_products_by_category(&ctx, "lighting")
                .await
                .unwrap()[0]
                .quantity,
            4
        );

        let detail = service
            .create_order(&ctx, customer_id, vec![OrderItemInput::new(product_id, 3)])
            .await
            .unwrap();
        assert_eq!(detail.order.total_amount, 75.0);

        assert_eq!(service.get_product(&ctx, product_id).await.unwrap().quantity, 1);
        assert_eq!(service.list_products(&ctx).await.unwrap()[0].quantity, 1);
        assert_eq!(
            service
                .list_products_by_category(&ctx, "lighting")
                .await
                .unwrap()[0]
                .quantity,
            1
        );
    }

    #[tokio::test]
    async fn test_cancelled_call_changes_nothing() {
        let (service, _db) = service().await;
        let ctx = CallContext::new();
        let (customer_id, product_id) = seed(&service, &ctx).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let cancelled = CallContext::new().with_cancel(cancel);

        let err = service
            .create_order(&cancelled, customer_id, vec![OrderItemInput::new(product_id, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert_eq!(err.http_status().as_u16(), 500);

        assert_eq!(service.get_product(&ctx, product_id).await.unwrap().quantity, 4);
        assert!(service.list_orders(&ctx).await.unwrap().is_empty());
        assert!(service.product_operations(&ctx, product_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_carry_presentation_codes() {
        let (service, _db) = service().await;
        let ctx = CallContext::new();
        let (customer_id, product_id) = seed(&service, &ctx).await;

        let err = service
            .create_order(&ctx, customer_id, vec![OrderItemInput::new(product_id, 10)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        assert_eq!(err.http_status().as_u16(), 400);

        let err = service.get_order(&ctx, 99).await.unwrap_err();
        assert_eq!(err.http_status().as_u16(), 404);

        let err = service
            .create_order(&ctx, customer_id, vec![])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    /// Stall every `order_items` insert so the order transaction stays open
    /// with the write lock held
    async fn stall_order_items(db: &DbService) {
        for sql in [
            "CREATE TABLE spin (n INTEGER NOT NULL)",
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 400) \
             INSERT INTO spin (n) SELECT x FROM c",
            "CREATE TRIGGER stall_items AFTER INSERT ON order_items BEGIN \
             SELECT count(*) FROM spin a, spin b, spin c WHERE a.n + b.n + c.n > 0; END",
        ] {
            sqlx::query(sql).execute(&db.pool).await.unwrap();
        }
    }

    async fn count(db: &DbService, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await
            .unwrap();
        n
    }

    async fn assert_untouched(service: &InventoryService, db: &DbService, product_id: i64) {
        // the only pooled connection is handed back after the rollback
        assert_eq!(count(db, "orders").await, 0);
        assert_eq!(count(db, "order_items").await, 0);
        assert_eq!(count(db, "operations").await, 0);
        assert_eq!(
            service
                .get_product(&CallContext::new(), product_id)
                .await
                .unwrap()
                .quantity,
            4
        );
    }

    #[tokio::test]
    async fn test_abandoned_transaction_rolls_back() {
        let (service, db) = service().await;
        let ctx = CallContext::new();
        let (customer_id, product_id) = seed(&service, &ctx).await;
        // cached before the order so a stale entry would show
        service.get_product(&ctx, product_id).await.unwrap();
        stall_order_items(&db).await;

        // cancelled while the items insert is running
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let err = service
            .create_order(
                &CallContext::new().with_cancel(cancel),
                customer_id,
                vec![OrderItemInput::new(product_id, 2)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert_untouched(&service, &db, product_id).await;

        // deadline passes while the items insert is running
        let err = service
            .create_order(
                &CallContext::new().with_timeout(Duration::from_millis(100)),
                customer_id,
                vec![OrderItemInput::new(product_id, 2)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert_untouched(&service, &db, product_id).await;

        // write lock released: the same order now goes through
        sqlx::query("DROP TRIGGER stall_items")
            .execute(&db.pool)
            .await
            .unwrap();
        service
            .create_order(&ctx, customer_id, vec![OrderItemInput::new(product_id, 2)])
            .await
            .unwrap();
        assert_eq!(service.get_product(&ctx, product_id).await.unwrap().quantity, 2);
    }

    /// Order repository that never finishes in time
    struct SlowOrders;

    #[async_trait]
    impl OrderRepository for SlowOrders {
        async fn create_order(
            &self,
            _customer_id: i64,
            _items: Vec<OrderItemInput>,
        ) -> RepoResult<OrderDetail> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            unreachable!("deadline fires first")
        }
        async fn get_by_id(&self, _id: i64) -> RepoResult<Order> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            unreachable!("deadline fires first")
        }
        async fn get_all(&self) -> RepoResult<Vec<Order>> {
            Ok(vec![])
        }
        async fn get_by_customer(&self, _customer_id: i64) -> RepoResult<Vec<Order>> {
            Ok(vec![])
        }
        async fn get_with_items(&self, _id: i64) -> RepoResult<OrderDetail> {
            unreachable!("not exercised")
        }
        async fn update_status(&self, _id: i64, _status: &str) -> RepoResult<Order> {
            Ok(Order {
                order_id: 1,
                customer_id: 1,
                total_amount: 0.0,
                status: OrderStatus::Paid,
                created_at: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_timeout() {
        let db = DbService::in_memory().await.unwrap();
        let ledger: Arc<dyn ProductRepository> =
            Arc::new(SqliteProductRepository::new(db.pool.clone()));
        let service = InventoryService::from_parts(
            CachedProductRepository::new(
                ledger,
                Arc::new(MemoryCache::new()),
                CachePolicy::default(),
            ),
            Arc::new(SqliteCustomerRepository::new(db.pool.clone())),
            Arc::new(SlowOrders),
            Arc::new(SqliteOperationRepository::new(db.pool.clone())),
            Duration::from_millis(50),
        );

        let err = service
            .create_order(&CallContext::new(), 1, vec![OrderItemInput::new(1, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);

        // a caller deadline tighter than the service timeout wins
        let started = Instant::now();
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        let err = service.get_order(&ctx, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
