//! Sign-ups and catalog writes issued concurrently against a file database.
//!
//! These transactions check references or duplicates before writing, so they
//! must queue for the write lock instead of failing when another writer
//! commits first.

use netshop_core::{CreateCustomer, CreateEmployee, CreatePerson, CreateProduct, CreateVariant};
use netshop_db::{Database, DbConfig, DbError};
use tempfile::TempDir;

async fn open() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("shop.db")).max_connections(8))
        .await
        .unwrap();
    (dir, db)
}

fn sign_up(n: usize, phone: &str) -> CreateCustomer {
    CreateCustomer {
        person: CreatePerson {
            first_name: "Shopper".into(),
            last_name: format!("No. {n}"),
            phone: phone.into(),
            email: format!("shopper{n}@example.com"),
            metadata: None,
        },
        username: format!("shopper{n}"),
        password_hash: "hash".into(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sign_ups_all_succeed() {
    let (_dir, db) = open().await;

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let db = db.clone();
            let request = sign_up(n, &format!("+47 1000 00{n:02}"));
            tokio::spawn(async move { db.customers().create(&request).await })
        })
        .collect();

    for handle in handles {
        let customer = handle.await.unwrap().unwrap();
        assert!(customer.username.starts_with("shopper"));
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_sign_ups_with_one_phone_admit_exactly_one() {
    let (_dir, db) = open().await;

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let db = db.clone();
            let request = sign_up(n, "+47 2222 2222");
            tokio::spawn(async move { db.customers().create(&request).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(DbError::UniqueViolation { field, .. }) => assert_eq!(field, "phone"),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_product_writes_all_succeed() {
    let (_dir, db) = open().await;

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

    let variant = CreateVariant {
        size_id: size.id,
        color_id: color.id,
        price_cents: 1500,
        stock: 3,
    };
    let product = |name: String| CreateProduct {
        name,
        description: String::new(),
        category_id: category.id,
        employee_id: employee.id,
        base_price_cents: 1500,
        variants: vec![variant.clone()],
    };

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let db = db.clone();
            let request = product(format!("Tee {n}"));
            tokio::spawn(async move { db.products().create(&request).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    assert_eq!(db.products().count().await.unwrap(), 8);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let request = variant.clone();
            let product_id = ids[0];
            tokio::spawn(async move { db.products().add_variant(product_id, &request).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(db.products().get_variants(ids[0]).await.unwrap().len(), 9);
}
