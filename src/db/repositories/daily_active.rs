//! Daily-activity repository
//!
//! Database operations for per-day activity markers.
//!
//! The insert is an idempotent upsert on the (user_id, date) primary key:
//! when two concurrent requests race on the same day, exactly one insert
//! wins and the other observes a harmless conflict that the store resolves
//! as a no-op.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Daily-activity repository trait
#[async_trait]
pub trait DailyActiveRepository: Send + Sync {
    /// Mark a user active on a date. Returns `true` if a new row was
    /// inserted, `false` if the marker already existed.
    async fn mark(&self, user_id: i64, date: NaiveDate) -> Result<bool>;

    /// Count distinct users seen active on a date
    async fn count_on(&self, date: NaiveDate) -> Result<i64>;
}

/// SQLx-based daily-activity repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxDailyActiveRepository {
    pool: DynDatabasePool,
}

impl SqlxDailyActiveRepository {
    /// Create a new SQLx daily-activity repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DailyActiveRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl DailyActiveRepository for SqlxDailyActiveRepository {
    async fn mark(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                mark_active_sqlite(self.pool.as_sqlite().unwrap(), user_id, date).await
            }
            DatabaseDriver::Mysql => {
                mark_active_mysql(self.pool.as_mysql().unwrap(), user_id, date).await
            }
        }
    }

    async fn count_on(&self, date: NaiveDate) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_on_sqlite(self.pool.as_sqlite().unwrap(), date).await,
            DatabaseDriver::Mysql => count_on_mysql(self.pool.as_mysql().unwrap(), date).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn mark_active_sqlite(pool: &SqlitePool, user_id: i64, date: NaiveDate) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO daily_actives (user_id, date)
        VALUES (?, ?)
        ON CONFLICT(user_id, date) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(date)
    .execute(pool)
    .await
    .context("Failed to mark daily activity")?;

    Ok(result.rows_affected() > 0)
}

async fn count_on_sqlite(pool: &SqlitePool, date: NaiveDate) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM daily_actives WHERE date = ?")
        .bind(date)
        .fetch_one(pool)
        .await
        .context("Failed to count daily actives")?;

    Ok(row.get("count"))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn mark_active_mysql(pool: &MySqlPool, user_id: i64, date: NaiveDate) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO daily_actives (user_id, date)
        VALUES (?, ?)
        "#,
    )
    .bind(user_id)
    .bind(date)
    .execute(pool)
    .await
    .context("Failed to mark daily activity")?;

    Ok(result.rows_affected() > 0)
}

async fn count_on_mysql(pool: &MySqlPool, date: NaiveDate) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM daily_actives WHERE date = ?")
        .bind(date)
        .fetch_one(pool)
        .await
        .context("Failed to count daily actives")?;

    Ok(row.get("count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::User;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxDailyActiveRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxDailyActiveRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &DynDatabasePool, n: i64) -> i64 {
        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                format!("user{}", n),
                format!("user{}@example.com", n),
                None,
            ))
            .await
            .expect("Failed to create test user");
        user.id
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("invalid date literal")
    }

    #[tokio::test]
    async fn test_mark_inserts_once() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, 1).await;

        let inserted = repo
            .mark(user_id, date("2026-08-30"))
            .await
            .expect("Failed to mark");
        assert!(inserted);
    }

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, 1).await;
        let d = date("2026-08-30");

        assert!(repo.mark(user_id, d).await.expect("first mark"));
        // Second call for the same (user, date) is a no-op, not an error
        assert!(!repo.mark(user_id, d).await.expect("second mark"));

        assert_eq!(repo.count_on(d).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_distinct_days_are_distinct_rows() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, 1).await;

        assert!(repo.mark(user_id, date("2026-08-30")).await.expect("mark"));
        assert!(repo.mark(user_id, date("2026-08-31")).await.expect("mark"));

        assert_eq!(repo.count_on(date("2026-08-30")).await.expect("count"), 1);
        assert_eq!(repo.count_on(date("2026-08-31")).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_count_on_counts_users() {
        let (pool, repo) = setup_test_repo().await;
        let d = date("2026-08-30");

        for n in 1..=3 {
            let user_id = create_test_user(&pool, n).await;
            repo.mark(user_id, d).await.expect("mark");
        }

        assert_eq!(repo.count_on(d).await.expect("count"), 3);
        assert_eq!(repo.count_on(date("2026-09-01")).await.expect("count"), 0);
    }
}
