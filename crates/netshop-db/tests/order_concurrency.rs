//! Order engine behavior against a file database with several connections.
//!
//! In-memory databases are limited to one connection, so contention between
//! concurrent orders can only be observed on a real file.

use std::time::Duration;

use netshop_core::{
    CreateCustomer, CreateEmployee, CreatePerson, CreateProduct, CreateVariant, CreateOrder,
    DeliveryAddress, OrderLine, OrderStatus,
};
use netshop_db::{Database, DbConfig, DbError};
use tempfile::TempDir;

struct Shop {
    _dir: TempDir,
    db: Database,
    customer_id: i64,
    variant_id: i64,
}

async fn shop(stock: i64, order_timeout: Option<Duration>) -> Shop {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::new(dir.path().join("shop.db"))
        .max_connections(8)
        .order_timeout(order_timeout);
    let db = Database::new(config).await.unwrap();

    let employee = db
        .employees()
        .create(&CreateEmployee {
            username: "admin".into(),
            password_hash: "hash".into(),
        })
        .await
        .unwrap();
    let category = db.categories().create("Shirts").await.unwrap();
    let size = db.sizes().create("M").await.unwrap();
    let color = db.colors().create("Black").await.unwrap();

    let product = db
        .products()
        .create(&CreateProduct {
            name: "Tee".into(),
            description: String::new(),
            category_id: category.id,
            employee_id: employee.id,
            base_price_cents: 1500,
            variants: vec![CreateVariant {
                size_id: size.id,
                color_id: color.id,
                price_cents: 1500,
                stock,
            }],
        })
        .await
        .unwrap();

    let customer = db
        .customers()
        .create(&CreateCustomer {
            person: CreatePerson {
                first_name: "Ada".into(),
                last_name: "Byron".into(),
                phone: "+44 20 7946 0000".into(),
                email: "ada@example.com".into(),
                metadata: None,
            },
            username: "ada".into(),
            password_hash: "hash".into(),
        })
        .await
        .unwrap();

    Shop {
        _dir: dir,
        db,
        customer_id: customer.id,
        variant_id: product.variants[0].id,
    }
}

fn order(customer_id: i64, variant_id: i64, quantity: i64) -> CreateOrder {
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
        items: vec![OrderLine {
            variant_id,
            quantity,
        }],
    }
}

async fn stock(db: &Database, variant_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM product_variants WHERE id = ?1")
        .bind(variant_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn committed_orders(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_orders_racing_for_the_same_stock() {
    let shop = shop(10, Some(Duration::from_secs(10))).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let db = shop.db.clone();
            let request = order(shop.customer_id, shop.variant_id, 6);
            tokio::spawn(async move { db.orders().create(&request).await })
        })
        .collect();

    let mut committed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                assert_eq!(order.items[0].quantity, 6);
                committed += 1;
            }
            Err(DbError::InsufficientStock {
                available, requested, ..
            }) => {
                assert_eq!((available, requested), (4, 6));
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!((committed, rejected), (1, 1));
    assert_eq!(stock(&shop.db, shop.variant_id).await, 4);
    assert_eq!(committed_orders(&shop.db).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_single_unit_orders_never_oversell() {
    let shop = shop(5, Some(Duration::from_secs(10))).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = shop.db.clone();
            let request = order(shop.customer_id, shop.variant_id, 1);
            tokio::spawn(async move { db.orders().create(&request).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(DbError::InsufficientStock { available: 0, .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(committed, 5);
    assert_eq!(stock(&shop.db, shop.variant_id).await, 0);
    assert_eq!(committed_orders(&shop.db).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deadline_expires_while_store_is_locked() {
    let deadline = Duration::from_millis(200);
    let shop = shop(10, Some(deadline)).await;

    // Another writer holds the write lock for longer than the deadline.
    let mut blocker = shop.db.pool().acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *blocker).await.unwrap();

    let err = shop
        .db
        .orders()
        .create(&order(shop.customer_id, shop.variant_id, 3))
        .await
        .unwrap_err();

    match err {
        DbError::Timeout { operation, after } => {
            assert_eq!(operation, "create order");
            assert_eq!(after, deadline);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }

    sqlx::query("ROLLBACK").execute(&mut *blocker).await.unwrap();
    drop(blocker);

    assert_eq!(stock(&shop.db, shop.variant_id).await, 10);
    assert_eq!(committed_orders(&shop.db).await, 0);
}
