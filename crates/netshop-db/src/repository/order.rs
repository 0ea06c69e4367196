//! # Order Repository
//!
//! The order engine: one transaction per order that records the order,
//! decrements stock and captures prices, or changes nothing at all.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Creation                                    │
//! │                                                                         │
//! │  validate request ──✗──► DbError::Validation (no SQL sent)              │
//! │       │                                                                 │
//! │  BEGIN                                             state: Pending       │
//! │       │                                                                 │
//! │  INSERT INTO orders ... SELECT ... WHERE EXISTS(customer)              │
//! │       │   RETURNING id, created_at, updated_at                          │
//! │       ├── no row ──────────────────────► NotFound(Customer)            │
//! │       │   (first statement is a write: takes SQLite's write lock,       │
//! │       │    concurrent orders queue here on busy_timeout)                │
//! │       │                                                                 │
//! │  read customer                                                          │
//! │       │                                            state: ItemsProcessing│
//! │  for each line:                                                         │
//! │    UPDATE product_variants SET stock = stock - q                        │
//! │      WHERE id = v AND stock >= q RETURNING price                        │
//! │       ├── no row, variant missing ─────► NotFound(Variant)             │
//! │       ├── no row, stock too low ───────► InsufficientStock             │
//! │    INSERT INTO order_items (..., price captured above)                  │
//! │       │                                                                 │
//! │  COMMIT                                            state: Committed     │
//! │                                                                         │
//! │  Any ✗ drops the transaction ──► ROLLBACK          state: RolledBack    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried. A deadline (`DbConfig::order_timeout`) cancels the
//! unit of work; dropping the in-flight transaction rolls it back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use netshop_core::validation::validate_create_order;
use netshop_core::{
    materialize_orders, CreateOrder, DeliveryAddress, Order, OrderItem, OrderLine, OrderRow,
    OrderStatus, SelectQuery, SortDirection,
};

use crate::error::{DbError, DbResult};
use crate::repository::bind_values;
use crate::repository::customer::fetch_customer;

const ORDER_COLUMNS: [&str; 15] = [
    "o.id AS order_id",
    "o.customer_id AS customer_id",
    "o.status AS status",
    "o.delivery_address AS address",
    "o.delivery_zipcode AS zipcode",
    "o.delivery_city AS city",
    "o.delivery_country AS country",
    "o.order_date AS order_date",
    "o.status_date AS status_date",
    "o.created_at AS created_at",
    "o.updated_at AS updated_at",
    "oi.id AS item_id",
    "oi.product_variant_id AS variant_id",
    "oi.price AS item_price",
    "oi.quantity AS quantity",
];

/// Progress of one order transaction, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Pending,
    ItemsProcessing,
    Committed,
    RolledBack,
}

/// Criteria for [`OrderRepository::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderListOptions {
    pub customer_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    timeout: Option<Duration>,
}

impl OrderRepository {
    /// Creates a repository without an order deadline.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository {
            pool,
            timeout: None,
        }
    }

    /// Sets the deadline applied by [`create`](Self::create).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates an order atomically.
    ///
    /// ## Returns
    /// * `Ok(Order)` - Committed order with customer and items (price, quantity)
    /// * `Err(DbError::Validation)` - Request rejected, nothing sent to the store
    /// * `Err(DbError::NotFound)` - Customer or a variant does not exist
    /// * `Err(DbError::InsufficientStock)` - A line exceeds the variant's stock
    /// * `Err(DbError::Timeout)` - Configured deadline expired
    ///
    /// On any error the store is left exactly as it was.
    pub async fn create(&self, request: &CreateOrder) -> DbResult<Order> {
        match self.timeout {
            Some(deadline) => self.create_with_deadline(request, deadline).await,
            None => {
                validate_create_order(request)?;
                self.run_create(request).await
            }
        }
    }

    /// Creates an order, giving up after `deadline`.
    ///
    /// Expiry drops the in-flight transaction, which rolls it back.
    pub async fn create_with_deadline(&self, request: &CreateOrder, deadline: Duration) -> DbResult<Order> {
        validate_create_order(request)?;

        match tokio::time::timeout(deadline, self.run_create(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    customer_id = request.customer_id,
                    state = ?OrderState::RolledBack,
                    deadline = ?deadline,
                    "Order deadline expired"
                );
                Err(DbError::Timeout {
                    operation: "create order",
                    after: deadline,
                })
            }
        }
    }

    async fn run_create(&self, request: &CreateOrder) -> DbResult<Order> {
        let result = self.create_in_transaction(request).await;

        match &result {
            Ok(order) => info!(
                order_id = order.id,
                customer_id = order.customer_id,
                items = order.items.len(),
                total = %order.total(),
                state = ?OrderState::Committed,
                "Order committed"
            ),
            Err(err) => warn!(
                customer_id = request.customer_id,
                error = %err,
                state = ?OrderState::RolledBack,
                "Order rolled back"
            ),
        }

        result
    }

    async fn create_in_transaction(&self, request: &CreateOrder) -> DbResult<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(customer_id = request.customer_id, state = ?OrderState::Pending, "Order transaction started");

        let now = Utc::now();
        let order_date = request.order_date.unwrap_or(now);
        let delivery = &request.delivery;

        let header: Option<(i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            INSERT INTO orders (
                customer_id,
                status,
                delivery_address,
                delivery_zipcode,
                delivery_city,
                delivery_country,
                status_date,
                order_date
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            WHERE EXISTS (SELECT 1 FROM customers WHERE id = ?1)
            RETURNING id, created_at, updated_at
            "#,
        )
        .bind(request.customer_id)
        .bind(request.status)
        .bind(delivery.address.trim())
        .bind(delivery.zipcode.trim())
        .bind(delivery.city.trim())
        .bind(delivery.country.trim())
        .bind(now)
        .bind(order_date)
        .fetch_optional(&mut *tx)
        .await?;

        let (order_id, created_at, updated_at) =
            header.ok_or_else(|| DbError::not_found("Customer", request.customer_id))?;

        let customer = fetch_customer(&mut *tx, request.customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", request.customer_id))?;

        debug!(order_id, state = ?OrderState::ItemsProcessing, "Order row inserted");

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            items.push(reserve_line(&mut tx, order_id, line).await?);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Order {
            id: order_id,
            customer_id: request.customer_id,
            customer: Some(customer),
            status: request.status,
            delivery: DeliveryAddress {
                address: delivery.address.trim().to_string(),
                zipcode: delivery.zipcode.trim().to_string(),
                city: delivery.city.trim().to_string(),
                country: delivery.country.trim().to_string(),
            },
            order_date,
            status_date: now,
            created_at,
            updated_at,
            items,
        })
    }

    /// Gets an order with its customer and items.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let built = order_select()
            .and_where("o.id = $id")
            .bind("id", id)
            .order_by("oi.id", SortDirection::Asc)
            .build_strict()?;

        let rows = bind_values(sqlx::query_as::<_, OrderRow>(&built.sql), &built.args)
            .fetch_all(&self.pool)
            .await?;

        let Some(mut order) = materialize_orders(rows).into_iter().next() else {
            return Ok(None);
        };

        order.customer = fetch_customer(&self.pool, order.customer_id).await?;
        Ok(Some(order))
    }

    /// Lists orders, newest first. `customer` is not resolved in listings.
    pub async fn list(&self, options: &OrderListOptions) -> DbResult<Vec<Order>> {
        let mut query = order_select();

        if let Some(customer_id) = options.customer_id {
            query = query
                .and_where("o.customer_id = $customerId")
                .bind("customerId", customer_id);
        }
        if let Some(status) = options.status {
            query = query.and_where("o.status = $status").bind("status", status.as_str());
        }

        let built = query
            .order_by("o.id", SortDirection::Desc)
            .order_by("oi.id", SortDirection::Asc)
            .build_strict()?;

        debug!(sql = %built.sql, "Listing orders");

        let rows = bind_values(sqlx::query_as::<_, OrderRow>(&built.sql), &built.args)
            .fetch_all(&self.pool)
            .await?;

        Ok(materialize_orders(rows))
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

fn order_select() -> SelectQuery {
    SelectQuery::new("orders o")
        .select(ORDER_COLUMNS)
        .left_join("order_items oi", "oi.order_id = o.id")
}

/// Decrements stock for one line and records it at the captured price.
async fn reserve_line(conn: &mut SqliteConnection, order_id: i64, line: &OrderLine) -> DbResult<OrderItem> {
    let price: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE product_variants
        SET stock = stock - ?1
        WHERE id = ?2 AND stock >= ?1
        RETURNING price
        "#,
    )
    .bind(line.quantity)
    .bind(line.variant_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(price_cents) = price else {
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM product_variants WHERE id = ?1")
            .bind(line.variant_id)
            .fetch_optional(&mut *conn)
            .await?;

        return Err(match available {
            None => DbError::not_found("Variant", line.variant_id),
            Some(available) => DbError::InsufficientStock {
                variant_id: line.variant_id,
                available,
                requested: line.quantity,
            },
        });
    };

    let item_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO order_items (order_id, product_variant_id, price, quantity)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(order_id)
    .bind(line.variant_id)
    .bind(price_cents)
    .bind(line.quantity)
    .fetch_one(&mut *conn)
    .await?;

    debug!(order_id, variant_id = line.variant_id, quantity = line.quantity, price_cents, "Line reserved");

    Ok(OrderItem {
        id: item_id,
        order_id,
        variant_id: line.variant_id,
        price_cents,
        quantity: line.quantity,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::catalog;
    use netshop_core::ValidationError;

    fn request(customer_id: i64, items: Vec<(i64, i64)>) -> CreateOrder {
        CreateOrder {
            customer_id,
            delivery: DeliveryAddress {
                address: "1 Main St".into(),
                zipcode: "0150".into(),
                city: "Oslo".into(),
                country: "NO".into(),
            },
            status: OrderStatus::Pending,
            order_date: None,
            items: items
                .into_iter()
                .map(|(variant_id, quantity)| OrderLine { variant_id, quantity })
                .collect(),
        }
    }

    async fn stock(db: &crate::Database, variant_id: i64) -> i64 {
        sqlx::query_scalar("SELECT stock FROM product_variants WHERE id = ?1")
            .bind(variant_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn order_count(db: &crate::Database) -> (i64, i64) {
        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        (orders, items)
    }

    #[tokio::test]
    async fn test_create_decrements_stock_and_captures_price() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let hat = c.product("Hat", 900, 5).await;
        let customer = c.customer("ada").await;
        let (shirt_v, hat_v) = (shirt.variants[0].id, hat.variants[0].id);

        let order = c
            .db
            .orders()
            .create(&request(customer.id, vec![(shirt_v, 2), (hat_v, 5)]))
            .await
            .unwrap();

        assert_eq!(order.customer.as_ref().map(|c| c.id), Some(customer.id));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!((order.items[0].price_cents, order.items[0].quantity), (2500, 2));
        assert_eq!((order.items[1].price_cents, order.items[1].quantity), (900, 5));
        assert_eq!(order.total().cents(), 9500);

        assert_eq!(stock(&c.db, shirt_v).await, 8);
        assert_eq!(stock(&c.db, hat_v).await, 0);

        let fetched = c.db.orders().get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.items, order.items);
        assert_eq!(fetched.delivery, order.delivery);
        assert_eq!(fetched.customer, order.customer);
        assert_eq!(fetched.created_at, order.created_at);
    }

    #[tokio::test]
    async fn test_captured_price_survives_price_change() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let customer = c.customer("ada").await;
        let variant_id = shirt.variants[0].id;

        let order = c
            .db
            .orders()
            .create(&request(customer.id, vec![(variant_id, 1)]))
            .await
            .unwrap();

        sqlx::query("UPDATE product_variants SET price = 9999 WHERE id = ?1")
            .bind(variant_id)
            .execute(c.db.pool())
            .await
            .unwrap();

        let fetched = c.db.orders().get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.items[0].price_cents, 2500);
    }

    #[tokio::test]
    async fn test_huge_stored_price_still_returns_the_order() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 50).await;
        let customer = c.customer("ada").await;
        let variant_id = shirt.variants[0].id;

        // Written behind the validators' back, e.g. by an import.
        sqlx::query("UPDATE product_variants SET price = ?1 WHERE id = ?2")
            .bind(i64::MAX / 4)
            .bind(variant_id)
            .execute(c.db.pool())
            .await
            .unwrap();

        let order = c
            .db
            .orders()
            .create(&request(customer.id, vec![(variant_id, 10)]))
            .await
            .unwrap();

        assert_eq!(order.items[0].price_cents, i64::MAX / 4);
        assert_eq!(order.total().cents(), i64::MAX);
        assert_eq!(stock(&c.db, variant_id).await, 40);
        assert_eq!(order_count(&c.db).await, (1, 1));
    }

    #[tokio::test]
    async fn test_oversized_line_rolls_back_everything() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let hat = c.product("Hat", 900, 1).await;
        let customer = c.customer("ada").await;
        let (shirt_v, hat_v) = (shirt.variants[0].id, hat.variants[0].id);

        let err = c
            .db
            .orders()
            .create(&request(customer.id, vec![(shirt_v, 3), (hat_v, 2)]))
            .await
            .unwrap_err();

        match err {
            DbError::InsufficientStock {
                variant_id,
                available,
                requested,
            } => {
                assert_eq!((variant_id, available, requested), (hat_v, 1, 2));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert!(DbError::InsufficientStock { variant_id: 0, available: 0, requested: 0 }.is_constraint());

        // The first line's decrement was rolled back too.
        assert_eq!(stock(&c.db, shirt_v).await, 10);
        assert_eq!(stock(&c.db, hat_v).await, 1);
        assert_eq!(order_count(&c.db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_missing_customer_and_variant() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let customer = c.customer("ada").await;

        let err = c
            .db
            .orders()
            .create(&request(customer.id + 100, vec![(shirt.variants[0].id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Customer"));

        let err = c
            .db
            .orders()
            .create(&request(customer.id, vec![(shirt.variants[0].id, 1), (4242, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Variant"));

        assert_eq!(stock(&c.db, shirt.variants[0].id).await, 10);
        assert_eq!(order_count(&c.db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_the_store() {
        let c = catalog().await;
        let customer = c.customer("ada").await;

        let err = c.db.orders().create(&request(customer.id, vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::Required { ref field }) if field == "items"
        ));

        let err = c
            .db
            .orders()
            .create(&request(customer.id, vec![(1, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let mut no_city = request(customer.id, vec![(1, 1)]);
        no_city.delivery.city.clear();
        assert!(matches!(
            c.db.orders().create(&no_city).await,
            Err(DbError::Validation(_))
        ));

        assert_eq!(order_count(&c.db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_order_date_and_status_are_kept() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let customer = c.customer("ada").await;

        let order_date = DateTime::parse_from_rfc3339("2026-03-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut req = request(customer.id, vec![(shirt.variants[0].id, 1)]);
        req.order_date = Some(order_date);
        req.status = OrderStatus::Paid;

        let order = c.db.orders().create(&req).await.unwrap();
        let fetched = c.db.orders().get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_date, order_date);
        assert_eq!(fetched.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_list_and_exists() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 10).await;
        let ada = c.customer("ada").await;
        let bob = c.customer("bob").await;
        let v = shirt.variants[0].id;

        let first = c.db.orders().create(&request(ada.id, vec![(v, 1)])).await.unwrap();
        let mut paid = request(ada.id, vec![(v, 1), (v, 2)]);
        paid.status = OrderStatus::Paid;
        let second = c.db.orders().create(&paid).await.unwrap();
        c.db.orders().create(&request(bob.id, vec![(v, 1)])).await.unwrap();

        let all = c.db.orders().list(&OrderListOptions::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|o| o.customer.is_none()));

        let ada_orders = c
            .db
            .orders()
            .list(&OrderListOptions {
                customer_id: Some(ada.id),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(
            ada_orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(ada_orders[0].items.len(), 2);

        let ada_paid = c
            .db
            .orders()
            .list(&OrderListOptions {
                customer_id: Some(ada.id),
                status: Some(OrderStatus::Paid),
            })
            .await
            .unwrap();
        assert_eq!(ada_paid.len(), 1);
        assert_eq!(ada_paid[0].id, second.id);

        assert!(c.db.orders().exists(first.id).await.unwrap());
        assert!(!c.db.orders().exists(second.id + 10).await.unwrap());
        assert_eq!(c.db.orders().get_by_id(second.id + 10).await.unwrap(), None);
        assert_eq!(stock(&c.db, v).await, 5);
    }

    #[tokio::test]
    async fn test_without_deadline() {
        let c = catalog().await;
        let shirt = c.product("Shirt", 2500, 1).await;
        let customer = c.customer("ada").await;

        let orders = OrderRepository::new(c.db.pool().clone());
        let order = orders
            .create(&request(customer.id, vec![(shirt.variants[0].id, 1)]))
            .await
            .unwrap();
        assert_eq!(order.items.len(), 1);
    }
}
