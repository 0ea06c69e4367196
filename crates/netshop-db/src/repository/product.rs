//! # Product Repository
//!
//! Catalog reads and product writes.
//!
//! ## Catalog Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How a Catalog Listing Is Served                      │
//! │                                                                         │
//! │  CatalogFilter { category_ids: [2], size_ids: [1, 3], limit: 20 }      │
//! │       │                                                                 │
//! │       ▼  translate()                                                    │
//! │  SelectQuery: products ⋈ categories ⋈ variants ⋈ sizes ⋈ colors        │
//! │               ⟕ variant_images ⟕ files                                  │
//! │       │                                                                 │
//! │       ▼  build_strict()                                                 │
//! │  "... WHERE (p.category_id IN (?1)) AND (pv.size_id IN (?2, ?3)) ..."  │
//! │       │                                                                 │
//! │       ▼  query_as::<CatalogRow>                                         │
//! │  one row per (variant, image)                                          │
//! │       │                                                                 │
//! │       ▼  materialize_products()                                         │
//! │  Vec<Product> with nested variants and image URLs                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listings join variants with an inner join, so a product without variants
//! does not appear in them. `get_by_id` still finds it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use netshop_core::filter::CatalogQuery;
use netshop_core::validation::{validate_create_product, validate_create_variant, validate_id};
use netshop_core::{
    materialize_products, CatalogFilter, CatalogRow, Category, CreateProduct, CreateVariant,
    ImageUrls, Product, ProductVariant,
};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, bind_values};

/// Product columns without variants.
#[derive(Debug, sqlx::FromRow)]
struct ProductHeaderRow {
    id: i64,
    name: String,
    description: String,
    base_price: i64,
    created_at: DateTime<Utc>,
    category_id: i64,
    category_name: String,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let page = repo.list(&CatalogFilter { limit: 20, ..Default::default() }).await?;
/// let product = repo.get_by_id(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    image_urls: ImageUrls,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, image_urls: ImageUrls) -> Self {
        ProductRepository { pool, image_urls }
    }

    /// Lists products matching a catalog filter.
    ///
    /// Products come back in the requested order, each with its variants in
    /// id order and each variant with its image URLs.
    pub async fn list(&self, filter: &CatalogFilter) -> DbResult<Vec<Product>> {
        let translated = filter.translate();
        if translated.order_fallback {
            debug!(
                requested = %filter.order_column,
                "Unknown order column, sorting by id"
            );
        }

        let built = translated.query.build_strict()?;
        debug!(sql = %built.sql, args = built.args.len(), "Listing products");

        let rows = bind_values(sqlx::query_as::<_, CatalogRow>(&built.sql), &built.args)
            .fetch_all(&self.pool)
            .await?;

        let products = materialize_products(rows, &self.image_urls);
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product with all of its variants.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (possibly with no variants)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let built = CatalogQuery::for_product(id).build_strict()?;

        let rows = bind_values(sqlx::query_as::<_, CatalogRow>(&built.sql), &built.args)
            .fetch_all(&self.pool)
            .await?;

        if let Some(product) = materialize_products(rows, &self.image_urls).into_iter().next() {
            return Ok(Some(product));
        }

        // No variant rows: the product may still exist on its own.
        let header = sqlx::query_as::<_, ProductHeaderRow>(
            r#"
            SELECT
                p.id,
                p.name,
                p.description,
                p.base_price,
                p.created_at,
                c.id AS category_id,
                c.name AS category_name
            FROM products p
            INNER JOIN categories c ON c.id = p.category_id
            WHERE p.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header.map(|h| Product {
            id: h.id,
            name: h.name,
            description: h.description,
            base_price_cents: h.base_price,
            category: Category {
                id: h.category_id,
                name: h.category_name,
            },
            created_at: h.created_at,
            variants: Vec::new(),
        }))
    }

    /// Variants of a product, in id order.
    pub async fn get_variants(&self, product_id: i64) -> DbResult<Vec<ProductVariant>> {
        self.get_by_id(product_id)
            .await?
            .map(|p| p.variants)
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    /// Creates a product together with its variants.
    ///
    /// ## What This Does
    /// 1. Validates the request
    /// 2. In one transaction: checks that the category, employee and every
    ///    referenced size and color exist, then inserts product and variants
    /// 3. Returns the stored product
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - A referenced row is missing (nothing written)
    pub async fn create(&self, request: &CreateProduct) -> DbResult<Product> {
        validate_create_product(request)?;

        debug!(
            name = %request.name,
            variants = request.variants.len(),
            "Creating product"
        );

        let mut tx = begin_write(&self.pool).await?;

        require_row(&mut tx, "categories", "Category", request.category_id).await?;
        require_row(&mut tx, "employees", "Employee", request.employee_id).await?;

        let product_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, base_price, category_id, employee_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.base_price_cents)
        .bind(request.category_id)
        .bind(request.employee_id)
        .fetch_one(&mut *tx)
        .await?;

        for variant in &request.variants {
            insert_variant(&mut tx, product_id, variant).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(id = product_id, "Product created");

        self.get_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    /// Adds a variant to an existing product.
    pub async fn add_variant(&self, product_id: i64, request: &CreateVariant) -> DbResult<ProductVariant> {
        validate_id("product_id", product_id)?;
        validate_create_variant(request)?;

        let mut tx = begin_write(&self.pool).await?;

        require_row(&mut tx, "products", "Product", product_id).await?;
        let variant_id = insert_variant(&mut tx, product_id, request).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(product_id, variant_id, "Variant added");

        self.get_variants(product_id)
            .await?
            .into_iter()
            .find(|v| v.id == variant_id)
            .ok_or_else(|| DbError::not_found("Variant", variant_id))
    }

    /// Links a stored file to a variant as one of its images.
    pub async fn attach_image(&self, variant_id: i64, file_id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        require_row(&mut tx, "product_variants", "Variant", variant_id).await?;
        require_row(&mut tx, "files", "File", file_id).await?;

        sqlx::query("INSERT INTO product_variant_images (variant_id, file_id) VALUES (?1, ?2)")
            .bind(variant_id)
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(variant_id, file_id, "Image attached");
        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fails with NotFound unless `table` has a row with this id.
///
/// `table` is always a literal from this module.
async fn require_row(
    conn: &mut SqliteConnection,
    table: &'static str,
    entity: &'static str,
    id: i64,
) -> DbResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;

    if !exists {
        warn!(entity, id, "Referenced row missing, rolling back");
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

async fn insert_variant(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant: &CreateVariant,
) -> DbResult<i64> {
    require_row(conn, "sizes", "Size", variant.size_id).await?;
    require_row(conn, "colors", "Color", variant.color_id).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO product_variants (product_id, size_id, color_id, price, stock)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(product_id)
    .bind(variant.size_id)
    .bind(variant.color_id)
    .bind(variant.price_cents)
    .bind(variant.stock)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================
