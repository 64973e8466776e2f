//! Customer Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, validate_customer_name, validate_e164, validate_email, validate_id,
};
use async_trait::async_trait;
use shared::models::{Customer, CustomerCreate, CustomerUpdate};
use shared::util::now_millis;
use sqlx::SqlitePool;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, data: CustomerCreate) -> RepoResult<Customer>;
    async fn get_by_id(&self, id: i64) -> RepoResult<Customer>;
    async fn get_all(&self) -> RepoResult<Vec<Customer>>;
    async fn update(&self, id: i64, data: CustomerUpdate) -> RepoResult<Customer>;
    /// Customers that still have orders cannot be deleted
    async fn delete(&self, id: i64) -> RepoResult<()>;
    async fn get_by_email(&self, email: &str) -> RepoResult<Customer>;
    async fn get_by_phone(&self, phone_number: &str) -> RepoResult<Customer>;
}

#[derive(Clone)]
pub struct SqliteCustomerRepository {
    base: BaseRepository,
}

impl SqliteCustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    async fn get_one(&self, column: &'static str, value: &str) -> RepoResult<Option<Customer>> {
        let sql = format!(
            "SELECT customer_id, name, phone_number, address, email, registered_at \
             FROM customers WHERE {column} = ?"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(value)
            .fetch_optional(self.base.pool())
            .await?;
        Ok(customer)
    }
}

/// Customer fields as stored: trimmed, then validated
struct Fields<'a> {
    name: &'a str,
    phone_number: &'a str,
    address: &'a str,
    email: &'a str,
}

fn validate_fields<'a>(
    name: &'a str,
    phone_number: &'a str,
    address: &'a str,
    email: &'a str,
) -> RepoResult<Fields<'a>> {
    let fields = Fields {
        name: name.trim(),
        phone_number: phone_number.trim(),
        address: address.trim(),
        email: email.trim(),
    };
    validate_customer_name(fields.name)?;
    validate_e164(fields.phone_number)?;
    validate_email(fields.email)?;
    if fields.address.chars().count() > MAX_ADDRESS_LEN {
        return Err(RepoError::Validation(format!(
            "address is too long (max {MAX_ADDRESS_LEN})"
        )));
    }
    Ok(fields)
}

/// SQLite reports unique violations as `UNIQUE constraint failed: customers.<column>`
fn duplicate_field(err: RepoError) -> RepoError {
    match err {
        RepoError::Duplicate(msg) if msg.contains("customers.email") => {
            RepoError::Duplicate("email already exists".into())
        }
        RepoError::Duplicate(msg) if msg.contains("customers.phone_number") => {
            RepoError::Duplicate("phone_number already exists".into())
        }
        other => other,
    }
}

fn not_found(id: i64) -> RepoError {
    RepoError::NotFound(format!("customer {id} not found"))
}

#[async_trait]
impl CustomerRepository for SqliteCustomerRepository {
    async fn create(&self, data: CustomerCreate) -> RepoResult<Customer> {
        let fields = validate_fields(&data.name, &data.phone_number, &data.address, &data.email)?;

        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (name, phone_number, address, email, registered_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING customer_id, name, phone_number, address, email, registered_at",
        )
        .bind(fields.name)
        .bind(fields.phone_number)
        .bind(fields.address)
        .bind(fields.email)
        .bind(now_millis())
        .fetch_one(self.base.pool())
        .await
        .map_err(|e| duplicate_field(e.into()))?;
        Ok(customer)
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Customer> {
        validate_id(id, "customer_id")?;
        sqlx::query_as::<_, Customer>(
            "SELECT customer_id, name, phone_number, address, email, registered_at \
             FROM customers WHERE customer_id = ?",
        )
        .bind(id)
        .fetch_optional(self.base.pool())
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn get_all(&self) -> RepoResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT customer_id, name, phone_number, address, email, registered_at \
             FROM customers ORDER BY customer_id",
        )
        .fetch_all(self.base.pool())
        .await?;
        Ok(customers)
    }

    async fn update(&self, id: i64, data: CustomerUpdate) -> RepoResult<Customer> {
        validate_id(id, "customer_id")?;
        let fields = validate_fields(&data.name, &data.phone_number, &data.address, &data.email)?;

        sqlx::query_as::<_, Customer>(
            "UPDATE customers SET name = ?, phone_number = ?, address = ?, email = ? \
             WHERE customer_id = ? \
             RETURNING customer_id, name, phone_number, address, email, registered_at",
        )
        .bind(fields.name)
        .bind(fields.phone_number)
        .bind(fields.address)
        .bind(fields.email)
        .bind(id)
        .fetch_optional(self.base.pool())
        .await
        .map_err(|e| duplicate_field(e.into()))?
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        validate_id(id, "customer_id")?;
        let result = sqlx::query("DELETE FROM customers WHERE customer_id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Conflict(_) => {
                    RepoError::Validation("customer has orders and cannot be deleted".into())
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Customer> {
        let email = email.trim();
        if email.is_empty() {
            return Err(RepoError::Validation("email cannot be empty".into()));
        }
        self.get_one("email", email)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("customer with email {email} not found")))
    }

    async fn get_by_phone(&self, phone_number: &str) -> RepoResult<Customer> {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return Err(RepoError::Validation("phone_number cannot be empty".into()));
        }
        self.get_one("phone_number", phone_number)
            .await?
            .ok_or_else(|| {
                RepoError::NotFound(format!("customer with phone {phone_number} not found"))
            })
    }
}
