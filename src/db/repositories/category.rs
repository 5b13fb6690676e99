//! Category repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List all categories, alphabetically
    async fn list(&self) -> Result<Vec<Category>>;

    /// Check whether a category with the given name exists
    async fn exists_by_name(&self, name: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>> {
        let sql = "SELECT id, name, created_at FROM categories ORDER BY name ASC";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows
                    .iter()
                    .map(|row| Category {
                        id: row.get("id"),
                        name: row.get("name"),
                        created_at: row.get("created_at"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows
                    .iter()
                    .map(|row| Category {
                        id: row.get("id"),
                        name: row.get("name"),
                        created_at: row.get("created_at"),
                    })
                    .collect())
            }
        }
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
                    .bind(name)
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to check category")?
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
                    .bind(name)
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to check category")?
            }
        };
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_list_seeded_categories() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool);

        let categories = repo.list().await.expect("Failed to list categories");
        assert!(!categories.is_empty());
        assert!(categories.iter().any(|c| c.name == "Technology"));

        // Alphabetical ordering
        let names: Vec<_> = categories.iter().map(|c| c.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        assert!(repo.exists_by_name("Technology").await.unwrap());
        assert!(!repo.exists_by_name("Nonexistent").await.unwrap());
    }
}
