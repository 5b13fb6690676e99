//! Comment service
//!
//! Business logic for comments: creation by authenticated users under an
//! existing post, and oldest-first listing for display.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, NewComment};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Parent post not found
    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// Validation error (blank content)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Create a comment under the post identified by `post_slug`.
    ///
    /// The author is always an authenticated user; the parent post must
    /// exist. Comments are immutable once created.
    pub async fn create(
        &self,
        user_id: i64,
        post_slug: &str,
        content: &str,
    ) -> Result<Comment, CommentServiceError> {
        if content.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text is required".to_string(),
            ));
        }

        let exists = self
            .posts
            .exists_by_slug(post_slug)
            .await
            .context("Failed to check parent post")?;
        if !exists {
            return Err(CommentServiceError::PostNotFound(post_slug.to_string()));
        }

        let comment = self
            .comments
            .create(&NewComment {
                user_id,
                post_slug: post_slug.to_string(),
                content: content.trim().to_string(),
            })
            .await
            .context("Failed to create comment")?;

        Ok(comment)
    }

    /// List a post's comments, ascending by creation time
    pub async fn list_by_post(
        &self,
        post_slug: &str,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .comments
            .list_by_post(post_slug)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        PostRepository, SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::NewPost;

    async fn setup() -> (DynDatabasePool, CommentService, i64, String) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = SqlxUserRepository::new(pool.clone())
            .create("g-1", "Alice", "alice@example.com")
            .await
            .unwrap()
            .id;

        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts
            .create(&NewPost {
                slug: "a-post-123456".to_string(),
                title: "A Post".to_string(),
                content: "body".to_string(),
                author_id: user_id,
                category: "Tech".to_string(),
            })
            .await
            .unwrap();

        let service = CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
        );
        (pool, service, user_id, post.slug)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_pool, service, user_id, slug) = setup().await;

        service
            .create(user_id, &slug, "Nice write-up!")
            .await
            .expect("Failed to comment");
        service
            .create(user_id, &slug, "Forgot to add…")
            .await
            .expect("Failed to comment");

        let comments = service.list_by_post(&slug).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "Nice write-up!");
        assert_eq!(comments[0].author_name, "Alice");
        assert!(comments[0].created_at <= comments[1].created_at);
    }

    #[tokio::test]
    async fn test_blank_content_rejected() {
        let (_pool, service, user_id, slug) = setup().await;

        let result = service.create(user_id, &slug, "   ").await;
        assert!(matches!(
            result,
            Err(CommentServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_parent_post() {
        let (_pool, service, user_id, _slug) = setup().await;

        let result = service
            .create(user_id, "no-such-post-999999", "hello?")
            .await;
        assert!(matches!(
            result,
            Err(CommentServiceError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_content_is_trimmed() {
        let (_pool, service, user_id, slug) = setup().await;

        let comment = service
            .create(user_id, &slug, "  padded  ")
            .await
            .unwrap();
        assert_eq!(comment.content, "padded");
    }
}
