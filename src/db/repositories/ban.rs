//! Ban repository
//!
//! Database operations for ban records.
//!
//! This module provides:
//! - `BanRepository` trait defining the interface for ban data access
//! - `SqlxBanRepository` implementing the trait for SQLite and MySQL
//!
//! Bans are keyed by user email. The repository returns raw records; the
//! point-in-time "is this ban in force" decision lives in
//! [`crate::services::ban::BanService`].

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Ban;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Ban repository trait
#[async_trait]
pub trait BanRepository: Send + Sync {
    /// Create or replace a ban record for an email
    async fn upsert(&self, ban: &Ban) -> Result<Ban>;

    /// Get ban record by exact email match
    async fn get_by_email(&self, email: &str) -> Result<Option<Ban>>;

    /// Remove a ban record
    async fn delete(&self, email: &str) -> Result<()>;

    /// List all ban records
    async fn list(&self) -> Result<Vec<Ban>>;
}

/// SQLx-based ban repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxBanRepository {
    pool: DynDatabasePool,
}

impl SqlxBanRepository {
    /// Create a new SQLx ban repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BanRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BanRepository for SqlxBanRepository {
    async fn upsert(&self, ban: &Ban) -> Result<Ban> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => upsert_ban_sqlite(self.pool.as_sqlite().unwrap(), ban).await,
            DatabaseDriver::Mysql => upsert_ban_mysql(self.pool.as_mysql().unwrap(), ban).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Ban>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_ban_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_ban_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn delete(&self, email: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_ban_sqlite(self.pool.as_sqlite().unwrap(), email).await,
            DatabaseDriver::Mysql => delete_ban_mysql(self.pool.as_mysql().unwrap(), email).await,
        }
    }

    async fn list(&self) -> Result<Vec<Ban>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_bans_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_bans_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn upsert_ban_sqlite(pool: &SqlitePool, ban: &Ban) -> Result<Ban> {
    sqlx::query(
        r#"
        INSERT INTO bans (email, expires_at, reason, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET expires_at = excluded.expires_at, reason = excluded.reason
        "#,
    )
    .bind(&ban.email)
    .bind(ban.expires_at)
    .bind(&ban.reason)
    .bind(ban.created_at)
    .execute(pool)
    .await
    .context("Failed to upsert ban")?;

    Ok(ban.clone())
}

async fn get_ban_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<Ban>> {
    let row = sqlx::query(
        r#"
        SELECT email, expires_at, reason, created_at
        FROM bans
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get ban by email")?;

    match row {
        Some(row) => Ok(Some(row_to_ban_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn delete_ban_sqlite(pool: &SqlitePool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM bans WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to delete ban")?;

    Ok(())
}

async fn list_bans_sqlite(pool: &SqlitePool) -> Result<Vec<Ban>> {
    let rows = sqlx::query("SELECT email, expires_at, reason, created_at FROM bans ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("Failed to list bans")?;

    let mut bans = Vec::with_capacity(rows.len());
    for row in &rows {
        bans.push(row_to_ban_sqlite(row)?);
    }

    Ok(bans)
}

fn row_to_ban_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Ban> {
    Ok(Ban {
        email: row.get("email"),
        expires_at: row.get("expires_at"),
        reason: row.get("reason"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn upsert_ban_mysql(pool: &MySqlPool, ban: &Ban) -> Result<Ban> {
    sqlx::query(
        r#"
        INSERT INTO bans (email, expires_at, reason, created_at)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE expires_at = VALUES(expires_at), reason = VALUES(reason)
        "#,
    )
    .bind(&ban.email)
    .bind(ban.expires_at)
    .bind(&ban.reason)
    .bind(ban.created_at)
    .execute(pool)
    .await
    .context("Failed to upsert ban")?;

    Ok(ban.clone())
}

async fn get_ban_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<Ban>> {
    let row = sqlx::query(
        r#"
        SELECT email, expires_at, reason, created_at
        FROM bans
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get ban by email")?;

    match row {
        Some(row) => Ok(Some(row_to_ban_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn delete_ban_mysql(pool: &MySqlPool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM bans WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await
        .context("Failed to delete ban")?;

    Ok(())
}

async fn list_bans_mysql(pool: &MySqlPool) -> Result<Vec<Ban>> {
    let rows = sqlx::query("SELECT email, expires_at, reason, created_at FROM bans ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("Failed to list bans")?;

    let mut bans = Vec::with_capacity(rows.len());
    for row in &rows {
        bans.push(row_to_ban_mysql(row)?);
    }

    Ok(bans)
}

fn row_to_ban_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Ban> {
    let expires_at: Option<DateTime<Utc>> = row.get("expires_at");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(Ban {
        email: row.get("email"),
        expires_at,
        reason: row.get("reason"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxBanRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxBanRepository::new(pool)
    }

    fn permanent_ban(email: &str, reason: Option<&str>) -> Ban {
        Ban {
            email: email.to_string(),
            expires_at: None,
            reason: reason.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_ban() {
        let repo = setup_test_repo().await;

        repo.upsert(&permanent_ban("a@x.com", Some("spam")))
            .await
            .expect("Failed to upsert ban");

        let found = repo
            .get_by_email("a@x.com")
            .await
            .expect("Failed to get ban")
            .expect("Ban not found");

        assert_eq!(found.email, "a@x.com");
        assert!(found.expires_at.is_none());
        assert_eq!(found.reason.as_deref(), Some("spam"));
    }

    #[tokio::test]
    async fn test_get_ban_no_record() {
        let repo = setup_test_repo().await;

        let found = repo
            .get_by_email("clean@x.com")
            .await
            .expect("Failed to query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let repo = setup_test_repo().await;

        repo.upsert(&permanent_ban("a@x.com", Some("first")))
            .await
            .expect("Failed to upsert ban");

        let updated = Ban {
            email: "a@x.com".to_string(),
            expires_at: Some(Utc::now() + Duration::days(7)),
            reason: Some("second".to_string()),
            created_at: Utc::now(),
        };
        repo.upsert(&updated).await.expect("Failed to re-upsert ban");

        let found = repo
            .get_by_email("a@x.com")
            .await
            .expect("Failed to get ban")
            .expect("Ban not found");

        assert!(found.expires_at.is_some());
        assert_eq!(found.reason.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_delete_ban() {
        let repo = setup_test_repo().await;

        repo.upsert(&permanent_ban("a@x.com", None))
            .await
            .expect("Failed to upsert ban");
        repo.delete("a@x.com").await.expect("Failed to delete ban");

        let found = repo
            .get_by_email("a@x.com")
            .await
            .expect("Failed to query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_bans() {
        let repo = setup_test_repo().await;

        repo.upsert(&permanent_ban("a@x.com", None))
            .await
            .expect("Failed to upsert ban");
        repo.upsert(&permanent_ban("b@x.com", None))
            .await
            .expect("Failed to upsert ban");

        let bans = repo.list().await.expect("Failed to list bans");
        assert_eq!(bans.len(), 2);
    }
}
