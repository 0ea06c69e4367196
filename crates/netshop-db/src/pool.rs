//! # Database Handle
//!
//! Opens the SQLite pool and hands out repositories that share it.
//!
//! ## Concurrency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One SQLite file, many request handlers                  │
//! │                                                                         │
//! │  list catalog ─┐                                                        │
//! │  list catalog ─┼──► SqlitePool (max_connections) ──► netshop.db (WAL)   │
//! │  create order ─┤         │                                              │
//! │  create order ─┘         │                                              │
//! │                          ▼                                              │
//! │   readers: never blocked, each sees the last committed state           │
//! │   writers: one at a time; the next waits up to busy_timeout            │
//! │   orders:  additionally bounded by order_timeout                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Foreign keys are switched on for every connection. SQLite leaves them off
//! unless asked.
//!
//! `:memory:` databases live and die with their single connection, so the
//! in-memory configuration pins it open for the lifetime of the pool.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use netshop_core::{Category, Color, ImageUrls, Size};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::employee::EmployeeRepository;
use crate::repository::file::FileRepository;
use crate::repository::lookup::LookupRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool and engine settings.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use netshop_db::DbConfig;
///
/// let config = DbConfig::new("./data/netshop.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2))
///     .order_timeout(None);
///
/// assert_eq!(config.max_connections, 8);
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a caller waits for a free pooled connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// How long a connection waits for SQLite's write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Apply embedded migrations when the pool opens.
    pub run_migrations: bool,

    /// Deadline for one order transaction. `None` waits indefinitely.
    /// Default: 10 seconds
    pub order_timeout: Option<Duration>,

    /// Public prefix for variant image URLs.
    /// Default: `/static/files`
    pub image_base_url: String,
}

impl DbConfig {
    /// Settings for a database file, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            order_timeout: Some(Duration::from_secs(10)),
            image_base_url: "/static/files".to_string(),
        }
    }

    /// A private, migrated, single-connection database. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets how long a writer waits for the database lock.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the order transaction deadline.
    pub fn order_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.order_timeout = timeout;
        self
    }

    pub fn image_base_url(mut self, base: impl Into<String>) -> Self {
        self.image_base_url = base.into();
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the shop database.
///
/// Cheap to clone; every clone and every repository it hands out use the
/// same pool.
///
/// ```rust,ignore
/// async fn place_order(db: &Database, request: CreateOrder) -> DbResult<Order> {
///     db.orders().create(&request).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    order_timeout: Option<Duration>,
    image_urls: ImageUrls,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let options = config.connect_options()?;
        debug!(busy_timeout = ?config.busy_timeout, order_timeout = ?config.order_timeout, "Connection options ready");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database {
            pool,
            order_timeout: config.order_timeout,
            image_urls: ImageUrls::new(config.image_base_url),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending embedded migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.image_urls.clone())
    }

    pub fn categories(&self) -> LookupRepository<Category> {
        LookupRepository::new(self.pool.clone())
    }

    pub fn sizes(&self) -> LookupRepository<Size> {
        LookupRepository::new(self.pool.clone())
    }

    pub fn colors(&self) -> LookupRepository<Color> {
        LookupRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.pool.clone())
    }

    pub fn files(&self) -> FileRepository {
        FileRepository::new(self.pool.clone())
    }

    /// Order engine, bounded by the configured deadline.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone()).with_timeout(self.order_timeout)
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// `true` if the store answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
