//! Database layer
//!
//! This module provides database abstraction for the Gwalk backend. It
//! supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) that
//! allows the application to work with either SQLite or MySQL without
//! knowing the specific backend. One pool is created at process start and
//! shared across all request handlers; it is closed on shutdown.
//!
//! # Usage
//!
//! ```ignore
//! use gwalk::config::DatabaseConfig;
//! use gwalk::db::{create_pool, DatabasePool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
