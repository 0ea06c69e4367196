//! # netshop-core: Pure Query & Catalog Logic
//!
//! This crate holds the parts of the shop backend that have real algorithmic
//! content but no I/O: building parameterized SQL, translating catalog
//! filters, and folding flat joined rows back into nested aggregates.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Netshop Data Flow                                │
//! │                                                                         │
//! │  Request handler (catalog filter / create order)                       │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │               ★ netshop-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   CatalogFilter ──► filter ──► SelectQuery ──► (sql, args)     │   │
//! │  │                                                                 │   │
//! │  │   Vec<CatalogRow> ──► materialize ──► Vec<Product>             │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ (sql, args)                    ▲ rows                          │
//! │  ┌────▼────────────────────────────────┴───────────────────────────┐   │
//! │  │                netshop-db (Database Layer)                      │   │
//! │  │        SQLite execution, transactions, order engine             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`query`] - Named-parameter SQL builder
//! - [`filter`] - Catalog filter → query translation
//! - [`materialize`] - Flat rows → Product/Order aggregates
//! - [`types`] - Domain types and request shapes
//! - [`money`] - Integer-cents money type
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use netshop_core::filter::CatalogFilter;
//!
//! let filter = CatalogFilter {
//!     category_ids: vec![1, 2],
//!     ..CatalogFilter::default()
//! };
//! let built = filter.translate().query.build();
//!
//! assert!(built.sql.contains("p.category_id IN (?1, ?2)"));
//! assert_eq!(built.args.len(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod materialize;
pub mod money;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{QueryError, ValidationError};
pub use filter::{CatalogFilter, CatalogQuery, OrderColumn};
pub use materialize::{materialize_orders, materialize_products, CatalogRow, ImageUrls, OrderRow};
pub use money::Money;
pub use query::{BuiltQuery, JoinKind, SelectQuery, SortDirection, SqlValue};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items accepted in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single variant in one order line.
///
/// ## Business Reason
/// Catches typos (1000 instead of 10) before they lock up stock.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price accepted for a product or variant, in cents.
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_ORDER_ITEMS` far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
