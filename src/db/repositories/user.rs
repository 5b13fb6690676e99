//! User repository
//!
//! Database operations for user accounts. Users are looked up by the
//! identity provider's subject id on every sign-in and inserted exactly once
//! per external identity.

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
    /// Insert a new user from identity provider profile data
    async fn create(&self, google_id: &str, name: &str, email: &str) -> Result<User>;

    /// Get user by internal ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by the identity provider's subject id
    async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>>;

    /// Delete a user (sessions cascade via foreign key)
    async fn delete(&self, id: i64) -> Result<()>;
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
    async fn create(&self, google_id: &str, name: &str, email: &str) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_user_sqlite(self.pool.as_sqlite().unwrap(), google_id, name, email).await
            }
            DatabaseDriver::Mysql => {
                create_user_mysql(self.pool.as_mysql().unwrap(), google_id, name, email).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_google_id_sqlite(self.pool.as_sqlite().unwrap(), google_id).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_google_id_mysql(self.pool.as_mysql().unwrap(), google_id).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete user")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(
    pool: &SqlitePool,
    google_id: &str,
    name: &str,
    email: &str,
) -> Result<User> {
    let now = Utc::now();
    let role = UserRole::default();

    let result = sqlx::query(
        r#"
        INSERT INTO users (google_id, name, email, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(google_id)
    .bind(name)
    .bind(email)
    .bind(role.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        google_id: google_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, google_id, name, email, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_google_id_sqlite(pool: &SqlitePool, google_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, google_id, name, email, role, created_at FROM users WHERE google_id = ?",
    )
    .bind(google_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by subject id")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(
    pool: &MySqlPool,
    google_id: &str,
    name: &str,
    email: &str,
) -> Result<User> {
    let now = Utc::now();
    let role = UserRole::default();

    let result = sqlx::query(
        r#"
        INSERT INTO users (google_id, name, email, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(google_id)
    .bind(name)
    .bind(email)
    .bind(role.to_string())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        google_id: google_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, google_id, name, email, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_google_id_mysql(pool: &MySqlPool, google_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, google_id, name, email, role, created_at FROM users WHERE google_id = ?",
    )
    .bind(google_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by subject id")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        google_id: row.get("google_id"),
        name: row.get("name"),
        email: row.get("email"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        google_id: row.get("google_id"),
        name: row.get("name"),
        email: row.get("email"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
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

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;

        let created = repo
            .create("google-123", "Alice", "alice@example.com")
            .await
            .expect("Failed to create user");

        assert_eq!(created.google_id, "google-123");
        assert_eq!(created.role, UserRole::User);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.name, "Alice");
        assert_eq!(found.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_get_by_google_id() {
        let repo = setup_test_repo().await;

        repo.create("google-abc", "Bob", "bob@example.com")
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_google_id("google-abc")
            .await
            .expect("Failed to look up")
            .expect("User not found");
        assert_eq!(found.name, "Bob");

        let missing = repo
            .get_by_google_id("google-unknown")
            .await
            .expect("Failed to look up");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_google_id_rejected() {
        let repo = setup_test_repo().await;

        repo.create("google-dup", "First", "first@example.com")
            .await
            .expect("Failed to create user");

        let result = repo.create("google-dup", "Second", "second@example.com").await;
        assert!(result.is_err());
    }
}
