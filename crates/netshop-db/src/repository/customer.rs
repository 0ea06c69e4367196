//! # Customer Repository
//!
//! Customer accounts and their contact details (`person`).
//!
//! ## Sign-up
//! ```text
//! BEGIN
//!   person with same phone or email? ──yes──► UniqueViolation (rollback)
//!   INSERT person   RETURNING id
//!   INSERT customer RETURNING id, created_at, updated_at
//! COMMIT
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, warn};

use netshop_core::validation::validate_create_customer;
use netshop_core::{CreateCustomer, Customer, Person};

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;

const CUSTOMER_SELECT: &str = r#"
    SELECT
        c.id,
        c.person_id,
        p.first_name,
        p.last_name,
        p.phone,
        p.email,
        p.metadata,
        p.email_verified,
        c.username,
        c.password AS password_hash,
        c.is_verified,
        c.created_at,
        c.updated_at
    FROM customers c
    INNER JOIN person p ON p.id = c.person_id
"#;

/// Flat customer + person row.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    person_id: i64,
    first_name: String,
    last_name: String,
    phone: String,
    email: String,
    metadata: Option<String>,
    email_verified: bool,
    username: String,
    password_hash: String,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            person_id: row.person_id,
            person: Person {
                id: row.person_id,
                first_name: row.first_name,
                last_name: row.last_name,
                phone: row.phone,
                email: row.email,
                metadata: row.metadata,
                email_verified: row.email_verified,
            },
            username: row.username,
            password_hash: row.password_hash,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer and its person record in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Phone, email or username taken
    pub async fn create(&self, request: &CreateCustomer) -> DbResult<Customer> {
        validate_create_customer(request)?;

        let person = &request.person;
        let phone = person.phone.trim();
        let email = person.email.trim();

        debug!(username = %request.username, "Creating customer");

        let mut tx = begin_write(&self.pool).await?;

        let taken: Option<(String, String)> = sqlx::query_as(
            "SELECT phone, email FROM person WHERE phone = ?1 OR email = ?2 LIMIT 1",
        )
        .bind(phone)
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((taken_phone, _)) = taken {
            warn!(username = %request.username, "Customer sign-up rejected: contact already registered");
            return Err(if taken_phone == phone {
                DbError::duplicate("phone", phone)
            } else {
                DbError::duplicate("email", email)
            });
        }

        let person_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO person (first_name, last_name, phone, email, metadata, email_verified)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            RETURNING id
            "#,
        )
        .bind(person.first_name.trim())
        .bind(person.last_name.trim())
        .bind(phone)
        .bind(email)
        .bind(person.metadata.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let customer_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO customers (username, password, person_id, is_verified)
            VALUES (?1, ?2, ?3, 0)
            RETURNING id
            "#,
        )
        .bind(request.username.trim())
        .bind(&request.password_hash)
        .bind(person_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, request.username.trim())
            }
            other => other,
        })?;

        let customer = fetch_customer(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(id = customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        fetch_customer(&self.pool, id).await
    }

    /// Looks up a customer for sign-in.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<Customer>> {
        let sql = format!("{CUSTOMER_SELECT} WHERE c.username = ?1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Reads a customer through any executor, so the order engine can resolve it
/// inside its own transaction.
pub(crate) async fn fetch_customer<'e, E>(executor: E, id: i64) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{CUSTOMER_SELECT} WHERE c.id = ?1");
    let row = sqlx::query_as::<_, CustomerRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Customer::from))
}
