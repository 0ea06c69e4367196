//! # Employee Repository
//!
//! Back-office accounts. Passwords arrive already hashed.

use sqlx::SqlitePool;
use tracing::debug;

use netshop_core::validation::validate_name;
use netshop_core::{CreateEmployee, Employee};

use crate::error::{DbError, DbResult};

/// Repository for employee database operations.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Inserts a new employee.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Username taken
    pub async fn create(&self, request: &CreateEmployee) -> DbResult<Employee> {
        validate_name("username", &request.username, 64)?;
        validate_name("password_hash", &request.password_hash, 512)?;

        debug!(username = %request.username, "Inserting employee");

        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (username, password)
            VALUES (?1, ?2)
            RETURNING id, username, password AS password_hash
            "#,
        )
        .bind(request.username.trim())
        .bind(&request.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, request.username.trim())
            }
            other => other,
        })?;

        Ok(employee)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, username, password AS password_hash FROM employees WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    /// Looks up an employee for sign-in.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, username, password AS password_hash FROM employees WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn request(username: &str) -> CreateEmployee {
        CreateEmployee {
            username: username.into(),
            password_hash: "$argon2id$hash".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let created = db.employees().create(&request("admin")).await.unwrap();
        assert_eq!(created.username, "admin");
        assert_eq!(created.password_hash, "$argon2id$hash");

        let by_name = db.employees().get_by_username("admin").await.unwrap();
        assert_eq!(by_name, Some(created.clone()));
        assert_eq!(db.employees().get_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(db.employees().get_by_username("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.employees().create(&request("admin")).await.unwrap();
        let err = db.employees().create(&request("admin")).await.unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "employees.username");
                assert_eq!(value, "admin");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }
}
