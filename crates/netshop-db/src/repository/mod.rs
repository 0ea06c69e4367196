//! # Repository Module
//!
//! Database repository implementations for the shop.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Request handler                                                       │
//! │       │                                                                 │
//! │       │  db.products().list(&filter)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── CatalogFilter::translate()   (netshop-core)                       │
//! │  ├── SelectQuery::build_strict()  (netshop-core)                       │
//! │  ├── sqlx query_as::<CatalogRow> + bind_values()                       │
//! │  └── materialize_products()       (netshop-core)                       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog listing and product writes
//! - [`LookupRepository`](lookup::LookupRepository) - Categories, sizes, colors
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer accounts
//! - [`EmployeeRepository`](employee::EmployeeRepository) - Back-office users
//! - [`FileRepository`](file::FileRepository) - Stored file metadata
//! - [`OrderRepository`](order::OrderRepository) - Transactional order engine

pub mod customer;
pub mod employee;
pub mod file;
pub mod lookup;
pub mod order;
pub mod product;

use netshop_core::SqlValue;
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Opens a transaction holding SQLite's write lock from its first statement.
///
/// Needed by every write transaction that reads before it writes: a deferred
/// transaction cannot upgrade to a writer after another connection commits,
/// and fails with "database is locked" without waiting on the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

/// Binds built query arguments in `?N` order.
pub(crate) fn bind_values<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    args: &[SqlValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
        };
    }
    query
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository tests.

    use netshop_core::{
        CreateCustomer, CreateEmployee, CreatePerson, CreateProduct, CreateVariant, Customer,
        Product,
    };

    use crate::{Database, DbConfig};

    pub struct Catalog {
        pub db: Database,
        pub employee_id: i64,
        pub category_id: i64,
        pub size_ids: Vec<i64>,
        pub color_ids: Vec<i64>,
    }

    pub async fn catalog() -> Catalog {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let employee = db
            .employees()
            .create(&CreateEmployee {
                username: "admin".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let category = db.categories().create("Shirts").await.unwrap();
        let s = db.sizes().create("S").await.unwrap();
        let m = db.sizes().create("M").await.unwrap();
        let red = db.colors().create("Red").await.unwrap();
        let blue = db.colors().create("Blue").await.unwrap();

        Catalog {
            db,
            employee_id: employee.id,
            category_id: category.id,
            size_ids: vec![s.id, m.id],
            color_ids: vec![red.id, blue.id],
        }
    }

    impl Catalog {
        pub fn product_request(&self, name: &str, variants: Vec<CreateVariant>) -> CreateProduct {
            CreateProduct {
                name: name.into(),
                description: format!("{name} description"),
                category_id: self.category_id,
                employee_id: self.employee_id,
                base_price_cents: 2000,
                variants,
            }
        }

        pub fn variant(&self, size: usize, color: usize, price_cents: i64, stock: i64) -> CreateVariant {
            CreateVariant {
                size_id: self.size_ids[size],
                color_id: self.color_ids[color],
                price_cents,
                stock,
            }
        }

        /// A product with one variant of the given price and stock.
        pub async fn product(&self, name: &str, price_cents: i64, stock: i64) -> Product {
            self.db
                .products()
                .create(&self.product_request(name, vec![self.variant(0, 0, price_cents, stock)]))
                .await
                .unwrap()
        }

        pub async fn customer(&self, username: &str) -> Customer {
            self.db
                .customers()
                .create(&customer_request(username))
                .await
                .unwrap()
        }
    }

    pub fn customer_request(username: &str) -> CreateCustomer {
        CreateCustomer {
            person: CreatePerson {
                first_name: "Ada".into(),
                last_name: "Byron".into(),
                // Distinct per username; keep usernames short (phone max 32).
                phone: username.bytes().map(|b| format!("{b:03}")).collect(),
                email: format!("{username}@example.com"),
                metadata: None,
            },
            username: username.into(),
            password_hash: "hash".into(),
        }
    }
}
