//! # Result Materializer
//!
//! Folds flat joined rows back into nested aggregates.
//!
//! ## Folding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rows (one per variant × image)            aggregates                   │
//! │                                                                         │
//! │  p1  v1  a.jpg          ──►   Product p1                                │
//! │  p1  v1  b.jpg                  ├── Variant v1 [a.jpg, b.jpg]           │
//! │  p1  v2  NULL                   └── Variant v2 []                       │
//! │  p2  v3  c.jpg                Product p2                                │
//! │                                 └── Variant v3 [c.jpg]                  │
//! │                                                                         │
//! │  Products and variants keep first-seen order (IndexMap).                │
//! │  Every non-null image path is appended; nothing is deduplicated.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All state lives inside one call, so concurrent requests never share maps.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::types::{
    Category, Color, DeliveryAddress, Order, OrderItem, OrderStatus, Product, ProductVariant, Size,
};

// =============================================================================
// Row Shapes
// =============================================================================

/// One row of the catalog query (see [`crate::filter`]).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CatalogRow {
    pub product_id: i64,
    pub product_name: String,
    pub product_description: String,
    pub base_price: i64,
    pub created_at: DateTime<Utc>,
    pub category_id: i64,
    pub category_name: String,
    pub variant_id: i64,
    pub size_id: i64,
    pub color_id: i64,
    pub variant_price: i64,
    pub stock: i64,
    pub size_name: String,
    pub color_name: String,
    /// NULL when the variant has no image.
    pub image_path: Option<String>,
}

/// One row of an order listing: order columns plus LEFT JOINed item columns.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderRow {
    pub order_id: i64,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub address: String,
    pub zipcode: String,
    pub city: String,
    pub country: String,
    pub order_date: DateTime<Utc>,
    pub status_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub item_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub item_price: Option<i64>,
    pub quantity: Option<i64>,
}

// =============================================================================
// Image URLs
// =============================================================================

/// Turns stored file paths into public URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: impl Into<String>) -> Self {
        ImageUrls { base: base.into() }
    }

    /// Public URL for a stored path.
    ///
    /// ```rust
    /// use netshop_core::materialize::ImageUrls;
    ///
    /// let urls = ImageUrls::new("https://cdn.example.com/files/");
    /// assert_eq!(urls.url("/shirts/red.webp"), "https://cdn.example.com/files/shirts/red.webp");
    /// assert_eq!(urls.url("https://other.example.com/x.png"), "https://other.example.com/x.png");
    /// ```
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || self.base.is_empty() {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Folds catalog rows into products, in first-seen order.
pub fn materialize_products<I>(rows: I, urls: &ImageUrls) -> Vec<Product>
where
    I: IntoIterator<Item = CatalogRow>,
{
    let mut products: IndexMap<i64, (Product, IndexMap<i64, ProductVariant>)> = IndexMap::new();

    for row in rows {
        let (_, variants) = products.entry(row.product_id).or_insert_with(|| {
            let product = Product {
                id: row.product_id,
                name: row.product_name.clone(),
                description: row.product_description.clone(),
                base_price_cents: row.base_price,
                category: Category {
                    id: row.category_id,
                    name: row.category_name.clone(),
                },
                created_at: row.created_at,
                variants: Vec::new(),
            };
            (product, IndexMap::new())
        });

        let variant = variants.entry(row.variant_id).or_insert_with(|| ProductVariant {
            id: row.variant_id,
            product_id: row.product_id,
            size: Size {
                id: row.size_id,
                name: row.size_name.clone(),
            },
            color: Color {
                id: row.color_id,
                name: row.color_name.clone(),
            },
            price_cents: row.variant_price,
            stock: row.stock,
            images: Vec::new(),
        });

        if let Some(path) = row.image_path.as_deref() {
            variant.images.push(urls.url(path));
        }
    }

    products
        .into_values()
        .map(|(mut product, variants)| {
            product.variants = variants.into_values().collect();
            product
        })
        .collect()
}

// =============================================================================
// Orders
// =============================================================================

/// Folds order-listing rows into orders, in first-seen order.
///
/// Rows whose item columns are NULL (an order without items) yield an order
/// with an empty item list. `customer` is left unresolved.
pub fn materialize_orders<I>(rows: I) -> Vec<Order>
where
    I: IntoIterator<Item = OrderRow>,
{
    let mut orders: IndexMap<i64, Order> = IndexMap::new();

    for row in rows {
        let order = orders.entry(row.order_id).or_insert_with(|| Order {
            id: row.order_id,
            customer_id: row.customer_id,
            customer: None,
            status: row.status,
            delivery: DeliveryAddress {
                address: row.address.clone(),
                zipcode: row.zipcode.clone(),
                city: row.city.clone(),
                country: row.country.clone(),
            },
            order_date: row.order_date,
            status_date: row.status_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            items: Vec::new(),
        });

        if let (Some(id), Some(variant_id), Some(price_cents), Some(quantity)) =
            (row.item_id, row.variant_id, row.item_price, row.quantity)
        {
            order.items.push(OrderItem {
                id,
                order_id: row.order_id,
                variant_id,
                price_cents,
                quantity,
            });
        }
    }

    orders.into_values().collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
