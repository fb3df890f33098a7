//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List all users with pagination
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_users_sqlite(self.pool.as_sqlite().unwrap(), page, per_page).await
            }
            DatabaseDriver::Mysql => {
                list_users_mysql(self.pool.as_mysql().unwrap(), page, per_page).await
            }
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, display_name, avatar, description, role, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, display_name, avatar, description, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.avatar)
    .bind(&user.description)
    .bind(&role_str)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        avatar: user.avatar.clone(),
        description: user.description.clone(),
        role: user.role,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, display_name = ?, avatar = ?, description = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.avatar)
    .bind(&user.description)
    .bind(&role_str)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_sqlite(pool: &SqlitePool, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
    let total = count_users_sqlite(pool).await?;
    let offset = (page.max(1) - 1) * per_page;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::with_capacity(rows.len());
    for row in &rows {
        users.push(row_to_user_sqlite(row)?);
    }

    Ok((users, total))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        avatar: row.get("avatar"),
        description: row.get("description"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, display_name, avatar, description, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.avatar)
    .bind(&user.description)
    .bind(&role_str)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        avatar: user.avatar.clone(),
        description: user.description.clone(),
        role: user.role,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, display_name = ?, avatar = ?, description = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.avatar)
    .bind(&user.description)
    .bind(&role_str)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_mysql(pool: &MySqlPool, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
    let total = count_users_mysql(pool).await?;
    let offset = (page.max(1) - 1) * per_page;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::with_capacity(rows.len());
    for row in &rows {
        users.push(row_to_user_mysql(row)?);
    }

    Ok((users, total))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        avatar: row.get("avatar"),
        description: row.get("description"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(username: &str, email: &str) -> User {
        User::new(username.to_string(), email.to_string(), None)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&test_user("walker", "walker@example.com"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);
        assert_eq!(created.role, UserRole::User);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.username, "walker");
        assert_eq!(found.email, "walker@example.com");
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let repo = setup_test_repo().await;

        repo.create(&test_user("walker", "walker@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_email("walker@example.com")
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.username, "walker");

        let missing = repo
            .get_by_email("nobody@example.com")
            .await
            .expect("Failed to query");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_by_username() {
        let repo = setup_test_repo().await;

        repo.create(&test_user("walker", "walker@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_username("walker")
            .await
            .expect("Failed to get user");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_update_user_role_and_profile() {
        let repo = setup_test_repo().await;

        let mut user = repo
            .create(&test_user("walker", "walker@example.com"))
            .await
            .expect("Failed to create user");

        user.role = UserRole::Admin;
        user.display_name = Some("Walker".to_string());
        user.description = Some("Event organizer".to_string());

        let updated = repo.update(&user).await.expect("Failed to update user");

        assert_eq!(updated.role, UserRole::Admin);
        assert_eq!(updated.display_name.as_deref(), Some("Walker"));
        assert_eq!(updated.description.as_deref(), Some("Event organizer"));
    }

    #[tokio::test]
    async fn test_count_and_list() {
        let repo = setup_test_repo().await;

        assert_eq!(repo.count().await.expect("count"), 0);

        for i in 0..3 {
            repo.create(&test_user(
                &format!("user{}", i),
                &format!("user{}@example.com", i),
            ))
            .await
            .expect("Failed to create user");
        }

        let (users, total) = repo.list(1, 2).await.expect("Failed to list users");
        assert_eq!(total, 3);
        assert_eq!(users.len(), 2);

        let (rest, _) = repo.list(2, 2).await.expect("Failed to list users");
        assert_eq!(rest.len(), 1);
    }
}
