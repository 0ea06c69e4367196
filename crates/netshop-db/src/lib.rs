//! # netshop-db: Database Layer for Netshop
//!
//! This crate provides database access for the shop backend.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Netshop Data Flow                                │
//! │                                                                         │
//! │  Request handler (list catalog / place order)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   netshop-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs,     │    │ CustomerRepo  │    │   _schema    │  │   │
//! │  │   │ busy_timeout  │    │ Lookups, ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                  $DATABASE_PATH (netshop.db)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, order, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netshop_core::CatalogFilter;
//! use netshop_db::{Database, NetshopConfig};
//!
//! let config = NetshopConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let shirts = db
//!     .products()
//!     .list(&CatalogFilter { category_ids: vec![1], ..Default::default() })
//!     .await?;
//! let order = db.orders().create(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, NetshopConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::file::FileRepository;
pub use repository::lookup::{LookupEntity, LookupRepository};
pub use repository::order::{OrderListOptions, OrderRepository, OrderState};
pub use repository::product::ProductRepository;
