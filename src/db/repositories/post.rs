//! Post repository
//!
//! Database operations for posts. Slug uniqueness is enforced here by the
//! UNIQUE constraint on `posts.slug`: an insert that loses a race surfaces a
//! [`SlugConflict`], which the post service converts into a fresh allocation
//! attempt instead of a user-visible failure.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{NewPost, Post, PostSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Insert failed because another post already owns the slug.
///
/// Carried inside the `anyhow::Error` chain so callers can recognize the
/// condition with `downcast_ref` and retry allocation.
#[derive(Debug, thiserror::Error)]
#[error("Post slug already exists: {0}")]
pub struct SlugConflict(pub String);

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post, returning the stored row.
    ///
    /// A unique-constraint violation on the slug column is reported as
    /// [`SlugConflict`].
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Check whether any post already uses the given slug
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Get a post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Get a post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// List posts, newest first, with optional substring search over
    /// title/content and an optional exact category filter
    async fn list(&self, search: Option<&str>, category: Option<&str>)
        -> Result<Vec<PostSummary>>;

    /// List all posts belonging to an author, newest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<PostSummary>>;

    /// Update title, content, and category of an existing post.
    /// The slug is never touched.
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post. Deleting an absent post is not an error.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
                    .bind(slug)
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to check slug existence")?
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
                    .bind(slug)
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to check slug existence")?
            }
        };
        Ok(count > 0)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(
                    "SELECT id, slug, title, content, author_id, category, created_at \
                     FROM posts WHERE slug = ?",
                )
                .bind(slug)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get post by slug")?;
                row.map(|r| row_to_post_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(
                    "SELECT id, slug, title, content, author_id, category, created_at \
                     FROM posts WHERE slug = ?",
                )
                .bind(slug)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get post by slug")?;
                row.map(|r| row_to_post_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(
                    "SELECT id, slug, title, content, author_id, category, created_at \
                     FROM posts WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get post by ID")?;
                row.map(|r| row_to_post_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(
                    "SELECT id, slug, title, content, author_id, category, created_at \
                     FROM posts WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get post by ID")?;
                row.map(|r| row_to_post_mysql(&r)).transpose()
            }
        }
    }

    async fn list(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<PostSummary>> {
        let mut sql = String::from(
            "SELECT p.id, p.slug, p.title, p.content, p.author_id, p.category, p.created_at, \
             COALESCE(u.name, 'Unknown') AS author_name \
             FROM posts p LEFT JOIN users u ON u.id = p.author_id WHERE 1=1",
        );
        if search.is_some() {
            sql.push_str(" AND (p.title LIKE ? OR p.content LIKE ?)");
        }
        if category.is_some() {
            sql.push_str(" AND p.category = ?");
        }
        sql.push_str(" ORDER BY p.created_at DESC");

        let pattern = search.map(|s| format!("%{}%", s));

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(ref p) = pattern {
                    query = query.bind(p).bind(p);
                }
                if let Some(c) = category {
                    query = query.bind(c);
                }
                let rows = query
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_summary_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(ref p) = pattern {
                    query = query.bind(p).bind(p);
                }
                if let Some(c) = category {
                    query = query.bind(c);
                }
                let rows = query
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list posts")?;
                rows.iter().map(row_to_summary_mysql).collect()
            }
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<PostSummary>> {
        let sql = "SELECT p.id, p.slug, p.title, p.content, p.author_id, p.category, \
                   p.created_at, COALESCE(u.name, 'Unknown') AS author_name \
                   FROM posts p LEFT JOIN users u ON u.id = p.author_id \
                   WHERE p.author_id = ? ORDER BY p.created_at DESC";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(author_id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list posts by author")?;
                rows.iter().map(row_to_summary_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(author_id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list posts by author")?;
                rows.iter().map(row_to_summary_mysql).collect()
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "UPDATE posts SET title = ?, content = ?, category = ? WHERE id = ?",
                )
                .bind(&post.title)
                .bind(&post.content)
                .bind(&post.category)
                .bind(post.id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "UPDATE posts SET title = ?, content = ?, category = ? WHERE id = ?",
                )
                .bind(&post.title)
                .bind(&post.content)
                .bind(&post.category)
                .bind(post.id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update post")?;
            }
        }
        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM posts WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM posts WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, author_id, category, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.author_id)
    .bind(&post.category)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| wrap_insert_error(e, &post.slug))?;

    Ok(Post {
        id: result.last_insert_rowid(),
        slug: post.slug.clone(),
        title: post.title.clone(),
        content: post.content.clone(),
        author_id: post.author_id,
        category: post.category.clone(),
        created_at: now,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, author_id, category, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.author_id)
    .bind(&post.category)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| wrap_insert_error(e, &post.slug))?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        slug: post.slug.clone(),
        title: post.title.clone(),
        content: post.content.clone(),
        author_id: post.author_id,
        category: post.category.clone(),
        created_at: now,
    })
}

/// Translate a slug unique-violation into [`SlugConflict`]; everything else
/// stays a generic persistence failure.
fn wrap_insert_error(e: sqlx::Error, slug: &str) -> anyhow::Error {
    let is_unique_violation = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique_violation {
        anyhow::Error::new(SlugConflict(slug.to_string()))
    } else {
        anyhow::Error::new(e).context("Failed to create post")
    }
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    })
}

fn row_to_summary_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostSummary> {
    let content: String = row.get("content");
    Ok(PostSummary {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: PostSummary::excerpt_of(&content),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    })
}

fn row_to_summary_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostSummary> {
    let content: String = row.get("content");
    Ok(PostSummary {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: PostSummary::excerpt_of(&content),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    })
}
