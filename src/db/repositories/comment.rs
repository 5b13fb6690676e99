//! Comment repository
//!
//! Database operations for comments. Comments are keyed to their parent post
//! by slug and listed oldest-first for display.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, NewComment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a new comment
    async fn create(&self, comment: &NewComment) -> Result<Comment>;

    /// List comments under a post, ascending by creation time, each with the
    /// author's display name
    async fn list_by_post(&self, post_slug: &str) -> Result<Vec<CommentWithAuthor>>;
}

/// SQLx-based comment repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIST_SQL: &str = "SELECT c.id, c.user_id, c.post_slug, c.content, c.created_at, \
     COALESCE(u.name, 'Unknown') AS author_name \
     FROM comments c LEFT JOIN users u ON u.id = c.user_id \
     WHERE c.post_slug = ? ORDER BY c.created_at ASC";

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.as_sqlite().unwrap(), comment).await
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.as_mysql().unwrap(), comment).await
            }
        }
    }

    async fn list_by_post(&self, post_slug: &str) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_SQL)
                    .bind(post_slug)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        id: row.get("id"),
                        user_id: row.get("user_id"),
                        author_name: row.get("author_name"),
                        post_slug: row.get("post_slug"),
                        content: row.get("content"),
                        created_at: row.get("created_at"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_SQL)
                    .bind(post_slug)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        id: row.get("id"),
                        user_id: row.get("user_id"),
                        author_name: row.get("author_name"),
                        post_slug: row.get("post_slug"),
                        content: row.get("content"),
                        created_at: row.get("created_at"),
                    })
                    .collect())
            }
        }
    }
}

async fn create_comment_sqlite(pool: &SqlitePool, comment: &NewComment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (user_id, post_slug, content, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(comment.user_id)
    .bind(&comment.post_slug)
    .bind(&comment.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        user_id: comment.user_id,
        post_slug: comment.post_slug.clone(),
        content: comment.content.clone(),
        created_at: now,
    })
}

async fn create_comment_mysql(pool: &MySqlPool, comment: &NewComment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (user_id, post_slug, content, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(comment.user_id)
    .bind(&comment.post_slug)
    .bind(&comment.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        user_id: comment.user_id,
        post_slug: comment.post_slug.clone(),
        content: comment.content.clone(),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &DynDatabasePool, subject: &str, name: &str) -> i64 {
        let users = SqlxUserRepository::new(pool.clone());
        users
            .create(subject, name, "user@example.com")
            .await
            .expect("Failed to create test user")
            .id
    }

    #[tokio::test]
    async fn test_create_and_list_in_order() {
        let (pool, repo) = setup_test_repo().await;
        let alice = create_test_user(&pool, "g-alice", "Alice").await;
        let bob = create_test_user(&pool, "g-bob", "Bob").await;

        repo.create(&NewComment {
            user_id: alice,
            post_slug: "some-post-123456".to_string(),
            content: "First!".to_string(),
        })
        .await
        .expect("Failed to create comment");

        repo.create(&NewComment {
            user_id: bob,
            post_slug: "some-post-123456".to_string(),
            content: "Second".to_string(),
        })
        .await
        .expect("Failed to create comment");

        // A comment on a different post must not appear in the listing
        repo.create(&NewComment {
            user_id: bob,
            post_slug: "other-post-654321".to_string(),
            content: "Elsewhere".to_string(),
        })
        .await
        .expect("Failed to create comment");

        let comments = repo
            .list_by_post("some-post-123456")
            .await
            .expect("Failed to list comments");

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "First!");
        assert_eq!(comments[0].author_name, "Alice");
        assert_eq!(comments[1].content, "Second");
        assert_eq!(comments[1].author_name, "Bob");
        assert!(comments[0].created_at <= comments[1].created_at);
    }

    #[tokio::test]
    async fn test_list_empty_post() {
        let (_pool, repo) = setup_test_repo().await;
        let comments = repo
            .list_by_post("no-such-post-000000")
            .await
            .expect("Listing an uncommented post should succeed");
        assert!(comments.is_empty());
    }
}
