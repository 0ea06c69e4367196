//! # Catalog Filter
//!
//! Turns a request-shaped [`CatalogFilter`] into the catalog [`SelectQuery`].
//!
//! ## Query Shape
//! ```text
//! products p
//!   INNER JOIN categories c              ON c.id = p.category_id
//!   INNER JOIN product_variants pv       ON pv.product_id = p.id
//!   INNER JOIN sizes s                   ON s.id = pv.size_id
//!   INNER JOIN colors co                 ON co.id = pv.color_id
//!   LEFT  JOIN product_variant_images pvi ON pvi.variant_id = pv.id
//!   LEFT  JOIN files f                   ON f.id = pvi.file_id
//! ```
//!
//! One row per (variant, image). The materializer folds them back together.
//!
//! ## Pagination
//! `limit`/`offset` count products, not joined rows. When either is set the
//! translator adds `p.id IN (<page>)`, where `<page>` is a sub-select with the
//! same filters grouped by product id, sorted the same way and paginated.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::query::{SelectQuery, SortDirection};

/// Columns selected by every catalog query, aliased to the row fields the
/// materializer expects.
const CATALOG_COLUMNS: [&str; 15] = [
    "p.id AS product_id",
    "p.name AS product_name",
    "p.description AS product_description",
    "p.base_price AS base_price",
    "p.created_at AS created_at",
    "c.id AS category_id",
    "c.name AS category_name",
    "pv.id AS variant_id",
    "pv.size_id AS size_id",
    "pv.color_id AS color_id",
    "pv.price AS variant_price",
    "pv.stock AS stock",
    "s.name AS size_name",
    "co.name AS color_name",
    "f.path AS image_path",
];

// =============================================================================
// Order Column
// =============================================================================

/// Product columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderColumn {
    #[default]
    Id,
    Name,
    BasePrice,
    CreatedAt,
}

impl OrderColumn {
    /// Looks up a column by its request name.
    ///
    /// Accepts both the camelCase names used by the storefront and the
    /// snake_case column names. Anything else returns `None`.
    ///
    /// ```rust
    /// use netshop_core::filter::OrderColumn;
    ///
    /// assert_eq!(OrderColumn::from_name("basePrice"), Some(OrderColumn::BasePrice));
    /// assert_eq!(OrderColumn::from_name("password"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(OrderColumn::Id),
            "name" => Some(OrderColumn::Name),
            "basePrice" | "base_price" => Some(OrderColumn::BasePrice),
            "createdAt" | "created_at" => Some(OrderColumn::CreatedAt),
            _ => None,
        }
    }

    /// Qualified column in the catalog query.
    pub fn column(self) -> &'static str {
        match self {
            OrderColumn::Id => "p.id",
            OrderColumn::Name => "p.name",
            OrderColumn::BasePrice => "p.base_price",
            OrderColumn::CreatedAt => "p.created_at",
        }
    }
}

// =============================================================================
// Catalog Filter
// =============================================================================

/// Catalog listing criteria, as received from the storefront.
///
/// Keys are camelCase on the wire (`categoryIds`, `orderColumn`); the
/// snake_case spellings are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogFilter {
    #[serde(alias = "category_ids")]
    pub category_ids: Vec<i64>,
    #[serde(alias = "size_ids")]
    pub size_ids: Vec<i64>,
    #[serde(alias = "color_ids")]
    pub color_ids: Vec<i64>,
    /// Lower bound on variant price, in cents.
    #[serde(alias = "min_price")]
    pub min_price: Option<i64>,
    /// Upper bound on variant price, in cents.
    #[serde(alias = "max_price")]
    pub max_price: Option<i64>,
    /// Products per page. 0 means unlimited.
    pub limit: i64,
    /// Products to skip. 0 means none.
    pub offset: i64,
    /// Requested sort column; see [`OrderColumn::from_name`].
    #[serde(alias = "order_column")]
    pub order_column: String,
    /// Ascending when set. Listings default to newest-id first.
    #[serde(alias = "order_asc")]
    pub order_asc: bool,
}

/// A translated catalog filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub query: SelectQuery,
    /// Sort column actually used.
    pub order: OrderColumn,
    /// Set when a non-empty `order_column` was not on the allow-list and the
    /// listing fell back to `id`.
    pub order_fallback: bool,
}

impl CatalogFilter {
    /// Whether the listing is paginated.
    pub fn is_paginated(&self) -> bool {
        self.limit > 0 || self.offset > 0
    }

    /// Builds the catalog query for this filter.
    pub fn translate(&self) -> CatalogQuery {
        let requested = self.order_column.trim();
        let (order, order_fallback) = if requested.is_empty() {
            (OrderColumn::Id, false)
        } else {
            match OrderColumn::from_name(requested) {
                Some(column) => (column, false),
                None => (OrderColumn::Id, true),
            }
        };
        let direction = SortDirection::from_asc(self.order_asc);

        let mut query = self.apply_filters(catalog_select());

        if self.is_paginated() {
            let page = self.product_page(order, direction);
            query = query
                .and_where(format!("p.id IN ({})", page.render()))
                .with_parameters_from(&page);
        }

        query = sort_products(query, order, direction)
            .order_by("pv.id", SortDirection::Asc)
            .order_by("pvi.id", SortDirection::Asc);

        CatalogQuery {
            query,
            order,
            order_fallback,
        }
    }

    fn apply_filters(&self, query: SelectQuery) -> SelectQuery {
        let mut query = query
            .where_in("p.category_id", "category_id", self.category_ids.iter().copied())
            .where_in("pv.size_id", "size_id", self.size_ids.iter().copied())
            .where_in("pv.color_id", "color_id", self.color_ids.iter().copied());

        if let Some(min) = self.min_price {
            query = query.and_where("pv.price >= $min_price").bind("min_price", min);
        }
        if let Some(max) = self.max_price {
            query = query.and_where("pv.price <= $max_price").bind("max_price", max);
        }

        query
    }

    /// Ids of the products on the requested page.
    fn product_page(&self, order: OrderColumn, direction: SortDirection) -> SelectQuery {
        let page = SelectQuery::new("products p")
            .select(["p.id"])
            .inner_join("product_variants pv", "pv.product_id = p.id");

        let mut page = sort_products(self.apply_filters(page).group_by("p.id"), order, direction);

        if self.limit > 0 {
            page = page.limit(self.limit);
        }
        if self.offset > 0 {
            page = page.offset(self.offset);
        }
        page
    }
}

impl CatalogQuery {
    /// Query for a single product and all of its variants.
    pub fn for_product(product_id: i64) -> SelectQuery {
        catalog_select()
            .and_where("p.id = $product_id")
            .bind("product_id", product_id)
            .order_by("pv.id", SortDirection::Asc)
            .order_by("pvi.id", SortDirection::Asc)
    }
}

fn catalog_select() -> SelectQuery {
    SelectQuery::new("products p")
        .select(CATALOG_COLUMNS)
        .inner_join("categories c", "c.id = p.category_id")
        .inner_join("product_variants pv", "pv.product_id = p.id")
        .inner_join("sizes s", "s.id = pv.size_id")
        .inner_join("colors co", "co.id = pv.color_id")
        .left_join("product_variant_images pvi", "pvi.variant_id = pv.id")
        .left_join("files f", "f.id = pvi.file_id")
}

/// Sorts by the product column, with product id as tiebreaker so pages stay
/// stable when names or prices repeat.
fn sort_products(query: SelectQuery, order: OrderColumn, direction: SortDirection) -> SelectQuery {
    let query = query.order_by(order.column(), direction);
    if order == OrderColumn::Id {
        query
    } else {
        query.order_by("p.id", direction)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
