//! Post service
//!
//! Business logic for post management: creation with slug allocation,
//! lookup, listing with search/category filters, and owner-scoped editing.

use crate::cache::Cache;
use crate::db::repositories::{PostRepository, SlugConflict};
use crate::models::{NewPost, Post, PostSummary, UpdatePostInput};
use crate::services::slug::SlugAllocator;
use anyhow::Context;
use std::sync::Arc;

/// Cache key prefix for post-by-slug reads
const CACHE_KEY_POST_BY_SLUG: &str = "post:slug:";

/// How many times to re-run slug allocation when an insert loses the race
/// against a concurrent publish with the same candidate.
const MAX_ALLOCATION_ROUNDS: usize = 3;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error (blank required field)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for managing blog posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    allocator: SlugAllocator,
    cache: Arc<Cache>,
}

impl PostService {
    /// Create a new post service
    pub fn new(repo: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        let allocator = SlugAllocator::new(repo.clone());
        Self {
            repo,
            allocator,
            cache,
        }
    }

    /// Create a new post for the given author.
    ///
    /// Validates required fields before any allocation or store write, then
    /// allocates a unique slug and inserts. If the insert hits the slug
    /// UNIQUE constraint (a concurrent publish won the same candidate),
    /// allocation is re-run with fresh randomness, up to a small bound.
    pub async fn create(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<Post, PostServiceError> {
        if title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title is required".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Content is required".to_string(),
            ));
        }
        if category.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Category is required".to_string(),
            ));
        }

        for _ in 0..MAX_ALLOCATION_ROUNDS {
            let slug = self
                .allocator
                .allocate(title)
                .await
                .context("Slug allocation failed")?;

            let input = NewPost {
                slug,
                title: title.trim().to_string(),
                content: content.to_string(),
                author_id,
                category: category.trim().to_string(),
            };

            match self.repo.create(&input).await {
                Ok(post) => return Ok(post),
                Err(e) if e.downcast_ref::<SlugConflict>().is_some() => {
                    tracing::warn!(slug = %input.slug, "Slug insert raced, reallocating");
                    continue;
                }
                Err(e) => return Err(PostServiceError::InternalError(e)),
            }
        }

        Err(PostServiceError::InternalError(anyhow::anyhow!(
            "Slug allocation kept colliding after {} rounds",
            MAX_ALLOCATION_ROUNDS
        )))
    }

    /// Get a post by its slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(Some(post));
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?;

        if let Some(ref p) = post {
            let _ = self.cache.set(&cache_key, p).await;
        }

        Ok(post)
    }

    /// List posts, newest first, optionally filtered
    pub async fn list(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<PostSummary>, PostServiceError> {
        let posts = self
            .repo
            .list(search, category)
            .await
            .context("Failed to list posts")?;
        Ok(posts)
    }

    /// List the posts belonging to an author
    pub async fn list_by_author(
        &self,
        author_id: i64,
    ) -> Result<Vec<PostSummary>, PostServiceError> {
        let posts = self
            .repo
            .list_by_author(author_id)
            .await
            .context("Failed to list posts by author")?;
        Ok(posts)
    }

    /// Get one of the author's own posts by id.
    ///
    /// A post that exists but belongs to someone else is reported as not
    /// found rather than forbidden, so the endpoint reveals nothing about
    /// other users' drafts.
    pub async fn get_own(&self, id: i64, author_id: i64) -> Result<Post, PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.author_id == author_id)
            .ok_or_else(|| PostServiceError::NotFound(format!("Post {}", id)))?;
        Ok(post)
    }

    /// Update one of the author's own posts. The slug never changes.
    pub async fn update_own(
        &self,
        id: i64,
        author_id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let mut post = self.get_own(id, author_id).await?;

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title is required".to_string(),
                ));
            }
            post.title = title.trim().to_string();
        }
        if let Some(content) = input.content {
            if content.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Content is required".to_string(),
                ));
            }
            post.content = content;
        }
        if let Some(category) = input.category {
            if category.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Category is required".to_string(),
                ));
            }
            post.category = category.trim().to_string();
        }

        let updated = self
            .repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        self.cache
            .delete(&format!("{}{}", CACHE_KEY_POST_BY_SLUG, updated.slug))
            .await;

        Ok(updated)
    }

    /// Delete one of the author's own posts
    pub async fn delete_own(&self, id: i64, author_id: i64) -> Result<(), PostServiceError> {
        let post = self.get_own(id, author_id).await?;

        self.repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?;

        self.cache
            .delete(&format!("{}{}", CACHE_KEY_POST_BY_SLUG, post.slug))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup() -> (DynDatabasePool, PostService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author_id = SqlxUserRepository::new(pool.clone())
            .create("g-1", "Alice", "alice@example.com")
            .await
            .expect("Failed to create user")
            .id;

        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            create_cache(&CacheConfig { ttl_seconds: 60 }),
        );
        (pool, service, author_id)
    }

    #[tokio::test]
    async fn test_create_allocates_suffixed_slug() {
        let (_pool, service, author) = setup().await;

        let post = service
            .create(author, "My First Post", "Hello", "Tech")
            .await
            .expect("Failed to create post");

        let re = regex::Regex::new(r"^my-first-post-\d{6}$").unwrap();
        assert!(re.is_match(&post.slug), "unexpected slug: {}", post.slug);

        let found = service
            .get_by_slug(&post.slug)
            .await
            .unwrap()
            .expect("Post should be retrievable by its slug");
        assert_eq!(found.content, "Hello");
        assert_eq!(found.category, "Tech");
    }

    #[tokio::test]
    async fn test_same_title_gets_distinct_slugs() {
        let (_pool, service, author) = setup().await;

        let a = service
            .create(author, "Duplicate Title", "one", "Tech")
            .await
            .unwrap();
        let b = service
            .create(author, "Duplicate Title", "two", "Tech")
            .await
            .unwrap();

        assert_ne!(a.slug, b.slug);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let (pool, service, author) = setup().await;

        for (title, content, category) in [
            ("", "content", "Tech"),
            ("   ", "content", "Tech"),
            ("Title", "", "Tech"),
            ("Title", "content", ""),
        ] {
            let result = service.create(author, title, content, category).await;
            assert!(matches!(
                result,
                Err(PostServiceError::ValidationError(_))
            ));
        }

        // Validation failures must not write anything
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_update_own_keeps_slug_and_invalidates_cache() {
        let (_pool, service, author) = setup().await;

        let post = service
            .create(author, "Original", "body", "Tech")
            .await
            .unwrap();

        // Warm the cache
        service.get_by_slug(&post.slug).await.unwrap();

        let updated = service
            .update_own(
                post.id,
                author,
                UpdatePostInput {
                    title: Some("Renamed".to_string()),
                    content: Some("new body".to_string()),
                    category: None,
                },
            )
            .await
            .expect("Failed to update");

        assert_eq!(updated.slug, post.slug);

        // Read-after-update sees the new content, not the cached row
        let found = service.get_by_slug(&post.slug).await.unwrap().unwrap();
        assert_eq!(found.title, "Renamed");
        assert_eq!(found.content, "new body");
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let (pool, service, author) = setup().await;

        let other = SqlxUserRepository::new(pool.clone())
            .create("g-2", "Mallory", "m@example.com")
            .await
            .unwrap()
            .id;

        let post = service
            .create(author, "Private Draft", "body", "Tech")
            .await
            .unwrap();

        // Someone else cannot see, edit, or delete it through the manage path
        assert!(matches!(
            service.get_own(post.id, other).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_own(post.id, other, UpdatePostInput::default())
                .await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_own(post.id, other).await,
            Err(PostServiceError::NotFound(_))
        ));

        // The owner can
        assert!(service.get_own(post.id, author).await.is_ok());
        service.delete_own(post.id, author).await.unwrap();
        assert!(service.get_by_slug(&post.slug).await.unwrap().is_none());
    }
}
