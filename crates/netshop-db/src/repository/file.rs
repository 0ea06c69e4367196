//! # File Repository
//!
//! Metadata of files already written to storage by the upload handler.
//! Image processing happens elsewhere; this only records the result.

use sqlx::SqlitePool;
use tracing::debug;

use netshop_core::validation::validate_create_file;
use netshop_core::{CreateFile, FileRecord};

use crate::error::DbResult;

const FILE_COLUMNS: &str = "id, filename, filetype, path, width, height, size_bytes, created_at";

/// Repository for file metadata.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FileRepository { pool }
    }

    /// Records a stored file.
    pub async fn create(&self, request: &CreateFile) -> DbResult<FileRecord> {
        validate_create_file(request)?;

        debug!(path = %request.path, filetype = %request.filetype, "Inserting file");

        let sql = format!(
            "INSERT INTO files (filename, filetype, path, width, height, size_bytes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {FILE_COLUMNS}"
        );
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(&request.filename)
            .bind(&request.filetype)
            .bind(&request.path)
            .bind(request.width)
            .bind(request.height)
            .bind(request.size_bytes)
            .fetch_one(&self.pool)
            .await?;

        Ok(file)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
