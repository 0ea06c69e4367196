//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by DATABASE_PATH (or .env)
//! cargo run -p netshop-db --bin seed
//!
//! # Specify database path
//! cargo run -p netshop-db --bin seed -- --db ./data/netshop.db
//!
//! # Verbose logging
//! RUST_LOG=netshop_db=debug cargo run -p netshop-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Categories, sizes and colors
//! - One employee (`admin`) who owns every product
//! - Products with one variant per size × color, each with an image
//! - One demo customer and a sample order

use std::env;

use netshop_core::{
    CatalogFilter, CreateCustomer, CreateEmployee, CreateFile, CreateOrder, CreatePerson,
    CreateProduct, CreateVariant, DeliveryAddress, OrderLine, OrderStatus,
};
use netshop_db::{Database, NetshopConfig};
use tracing_subscriber::EnvFilter;

/// (category, [(product name, base price in cents)])
const CATALOG: &[(&str, &[(&str, i64)])] = &[
    (
        "T-Shirts",
        &[
            ("Classic Crew Tee", 1999),
            ("Pocket Tee", 2199),
            ("Heavyweight Tee", 2899),
            ("Striped Tee", 2499),
        ],
    ),
    (
        "Hoodies",
        &[
            ("Zip Hoodie", 5499),
            ("Pullover Hoodie", 4999),
            ("Fleece Hoodie", 5999),
        ],
    ),
    (
        "Caps",
        &[("Dad Cap", 1799), ("Snapback", 2299), ("Beanie", 1599)],
    ),
];

/// Size names with the surcharge added to the base price.
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 200), ("XL", 400)];

const COLORS: &[&str] = &["Black", "White", "Navy", "Red"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = NetshopConfig::load()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Netshop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Netshop Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database_path.display());
    println!();

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Lookups
    let mut sizes = Vec::with_capacity(SIZES.len());
    for (name, surcharge) in SIZES {
        sizes.push((db.sizes().create(name).await?, *surcharge));
    }
    let mut colors = Vec::with_capacity(COLORS.len());
    for name in COLORS {
        colors.push(db.colors().create(name).await?);
    }

    let admin = db
        .employees()
        .create(&CreateEmployee {
            username: "admin".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$seed$seed".to_string(),
        })
        .await?;
    println!("✓ Created employee '{}'", admin.username);

    // Products
    let mut generated = 0;
    let mut variants = 0;
    for (category_name, products) in CATALOG {
        let category = db.categories().create(category_name).await?;

        for (product_idx, (name, base_price_cents)) in products.iter().enumerate() {
            let request = CreateProduct {
                name: name.to_string(),
                description: format!("{name} from our {category_name} range."),
                category_id: category.id,
                employee_id: admin.id,
                base_price_cents: *base_price_cents,
                variants: sizes
                    .iter()
                    .enumerate()
                    .flat_map(|(size_idx, (size, surcharge))| {
                        colors.iter().enumerate().map(move |(color_idx, color)| CreateVariant {
                            size_id: size.id,
                            color_id: color.id,
                            price_cents: base_price_cents + surcharge,
                            stock: ((product_idx * 7 + size_idx * 5 + color_idx * 3) % 25) as i64,
                        })
                    })
                    .collect(),
            };

            let product = match db.products().create(&request).await {
                Ok(product) => product,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };

            for variant in &product.variants {
                let slug = name.to_lowercase().replace(' ', "-");
                let color = variant.color.name.to_lowercase();
                let file = db
                    .files()
                    .create(&CreateFile {
                        filename: format!("{slug}-{color}.webp"),
                        filetype: "image/webp".to_string(),
                        path: format!("products/{slug}/{color}-{}.webp", variant.size.name.to_lowercase()),
                        width: 1200,
                        height: 1600,
                        size_bytes: 84_000 + variant.id * 13,
                    })
                    .await?;
                db.products().attach_image(variant.id, file.id).await?;
            }

            generated += 1;
            variants += product.variants.len();
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products ({} variants) in {:?}", generated, variants, elapsed);

    // Customer + sample order
    let customer = db
        .customers()
        .create(&CreateCustomer {
            person: CreatePerson {
                first_name: "Demo".to_string(),
                last_name: "Customer".to_string(),
                phone: "+47 400 00 000".to_string(),
                email: "demo@example.com".to_string(),
                metadata: Some(serde_json::json!({ "newsletter": true }).to_string()),
            },
            username: "demo".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$seed$seed".to_string(),
        })
        .await?;
    println!("✓ Created customer '{}'", customer.username);

    let in_stock = db
        .products()
        .list(&CatalogFilter {
            limit: 2,
            ..CatalogFilter::default()
        })
        .await?;
    let items: Vec<OrderLine> = in_stock
        .iter()
        .filter_map(|p| p.variants.iter().find(|v| v.can_fulfil(1)))
        .map(|v| OrderLine {
            variant_id: v.id,
            quantity: 1,
        })
        .collect();

    if !items.is_empty() {
        let order = db
            .orders()
            .create(&CreateOrder {
                customer_id: customer.id,
                delivery: DeliveryAddress {
                    address: "Karl Johans gate 1".to_string(),
                    zipcode: "0154".to_string(),
                    city: "Oslo".to_string(),
                    country: "Norway".to_string(),
                },
                status: OrderStatus::Pending,
                order_date: None,
                items,
            })
            .await?;
        println!("✓ Placed order #{} totalling {}", order.id, order.total());
    }

    // Verify catalog queries
    println!();
    println!("Verifying catalog queries...");
    let first_category = db.categories().list().await?;
    if let Some(category) = first_category.first() {
        let filtered = db
            .products()
            .list(&CatalogFilter {
                category_ids: vec![category.id],
                ..CatalogFilter::default()
            })
            .await?;
        println!("  Category '{}': {} products", category.name, filtered.len());
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
