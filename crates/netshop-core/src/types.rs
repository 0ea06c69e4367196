//! # Domain Types
//!
//! Aggregates returned to request handlers and the request shapes they send in.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Product ──┬── Category                 Order ──┬── Customer ── Person  │
//! │            └── ProductVariant[]                 ├── DeliveryAddress     │
//! │                 ├── Size                        └── OrderItem[]         │
//! │                 ├── Color                            (price snapshot)   │
//! │                 └── images: String[]                                    │
//! │                                                                         │
//! │  FileRecord ◄── product_variant_images ──► ProductVariant              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are the store's `INTEGER PRIMARY KEY` values (i64). Monetary
//! fields are integer cents; see [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Lookup Entities
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A variant size (S, M, 42, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Size {
    pub id: i64,
    pub name: String,
}

/// A variant color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Color {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// A purchasable size/color/price/stock instance of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub size: Size,
    pub color: Color,
    /// Current price in cents.
    pub price_cents: i64,
    /// Units on hand. Never negative once written by the order engine.
    pub stock: i64,
    /// Public image URLs, in join order.
    pub images: Vec<String>,
}

impl ProductVariant {
    /// Whether `quantity` units could be ordered right now.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

/// A catalog product with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price shown before a variant is picked, in cents.
    pub base_price_cents: i64,
    pub category: Category,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Total units on hand across all variants.
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }
}

/// Stored file metadata (images uploaded by the admin tools).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    /// MIME type, e.g. `image/webp`.
    pub filetype: String,
    /// Path relative to the public files root.
    pub path: String,
    pub width: i64,
    pub height: i64,
    pub size_bytes: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// People
// =============================================================================

/// Contact details shared by customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    /// Free-form JSON document.
    pub metadata: Option<String>,
    pub email_verified: bool,
}

/// A shop customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub person_id: i64,
    pub person: Person,
    pub username: String,
    /// Hash produced by the auth layer. Never leaves the backend.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub is_verified: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A back-office user. Products record which employee created them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stored/text form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Where an order is shipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryAddress {
    pub address: String,
    pub zipcode: String,
    pub city: String,
    pub country: String,
}

/// One line of a committed order.
///
/// `price_cents` is the variant price captured by the same statement that
/// decremented stock. It is a snapshot and is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub price_cents: i64,
    pub quantity: i64,
}

impl OrderItem {
    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents) * self.quantity
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    /// Resolved on create and get; absent in listings.
    pub customer: Option<Customer>,
    pub status: OrderStatus,
    pub delivery: DeliveryAddress,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub status_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of the captured line totals.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

// =============================================================================
// Request Shapes
// =============================================================================

/// A requested order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub variant_id: i64,
    pub quantity: i64,
}

/// Input to the order engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrder {
    pub customer_id: i64,
    pub delivery: DeliveryAddress,
    #[serde(default)]
    pub status: OrderStatus,
    /// Defaults to the time of creation.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<OrderLine>,
}

/// A variant supplied with a new product or added later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateVariant {
    pub size_id: i64,
    pub color_id: i64,
    pub price_cents: i64,
    pub stock: i64,
}

/// Input for creating a product together with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateProduct {
    pub name: String,
    pub description: String,
    pub category_id: i64,
    /// Filled in by the handler from the authenticated employee.
    pub employee_id: i64,
    pub base_price_cents: i64,
    #[serde(default)]
    pub variants: Vec<CreateVariant>,
}

/// Contact details for a new customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePerson {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Input for customer sign-up. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCustomer {
    pub person: CreatePerson,
    pub username: String,
    pub password_hash: String,
}

/// Input for employee sign-up. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateEmployee {
    pub username: String,
    pub password_hash: String,
}

/// Metadata of an already stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateFile {
    pub filename: String,
    pub filetype: String,
    pub path: String,
    pub width: i64,
    pub height: i64,
    pub size_bytes: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
