//! # Lookup Repository
//!
//! Categories, sizes and colors share one `{id, name}` shape, so one generic
//! repository serves all three.

use std::marker::PhantomData;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use netshop_core::validation::validate_name;
use netshop_core::{Category, Color, SelectQuery, Size, SortDirection};

use crate::error::{DbError, DbResult};
use crate::repository::bind_values;

/// A `{id, name}` lookup table.
pub trait LookupEntity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Table name. Never taken from user input.
    const TABLE: &'static str;
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;
}

impl LookupEntity for Category {
    const TABLE: &'static str = "categories";
    const ENTITY: &'static str = "Category";
}

impl LookupEntity for Size {
    const TABLE: &'static str = "sizes";
    const ENTITY: &'static str = "Size";
}

impl LookupEntity for Color {
    const TABLE: &'static str = "colors";
    const ENTITY: &'static str = "Color";
}

/// Repository for one lookup table.
#[derive(Debug)]
pub struct LookupRepository<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for LookupRepository<T> {
    fn clone(&self) -> Self {
        LookupRepository {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: LookupEntity> LookupRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        LookupRepository {
            pool,
            _entity: PhantomData,
        }
    }

    fn select() -> SelectQuery {
        SelectQuery::new(T::TABLE).select(["id", "name"])
    }

    /// All rows, oldest first.
    pub async fn list(&self) -> DbResult<Vec<T>> {
        let built = Self::select().order_by("id", SortDirection::Asc).build_strict()?;

        let rows = bind_values(sqlx::query_as::<_, T>(&built.sql), &built.args)
            .fetch_all(&self.pool)
            .await?;

        debug!(table = T::TABLE, count = rows.len(), "Listed lookups");
        Ok(rows)
    }

    /// Gets a row by id.
    ///
    /// ## Returns
    /// * `Ok(Some(T))` - Row found
    /// * `Ok(None)` - Row not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<T>> {
        let built = Self::select()
            .and_where("id = $id")
            .bind("id", id)
            .build_strict()?;

        let row = bind_values(sqlx::query_as::<_, T>(&built.sql), &built.args)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", T::TABLE);
        let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(exists)
    }

    /// Inserts a new row.
    pub async fn create(&self, name: &str) -> DbResult<T> {
        validate_name("name", name, 100)?;

        debug!(table = T::TABLE, name = %name, "Inserting lookup");

        let sql = format!("INSERT INTO {} (name) VALUES (?1) RETURNING id, name", T::TABLE);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(name.trim())
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    /// Like [`get_by_id`](Self::get_by_id), but a missing row is an error.
    pub async fn require(&self, id: i64) -> DbResult<T> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(T::ENTITY, id))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let shirts = db.categories().create("Shirts").await.unwrap();
        db.categories().create("Pants").await.unwrap();

        let names: Vec<String> = db
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Shirts", "Pants"]);

        let fetched = db.categories().get_by_id(shirts.id).await.unwrap();
        assert_eq!(fetched, Some(shirts));
    }

    #[tokio::test]
    async fn test_tables_are_separate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let red = db.colors().create("Red").await.unwrap();
        assert!(db.colors().exists(red.id).await.unwrap());
        assert!(db.sizes().list().await.unwrap().is_empty());
        assert!(!db.sizes().exists(red.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.sizes().get_by_id(99).await.unwrap(), None);
        assert!(matches!(
            db.sizes().require(99).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.categories().create("  ").await,
            Err(DbError::Validation(_))
        ));
    }
}
