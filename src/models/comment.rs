//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity. Comments are write-once: there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Comment author (always an authenticated user)
    pub user_id: i64,
    /// Parent post, referenced by slug
    pub post_slug: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment with the author's display name, for listing under a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub post_slug: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub user_id: i64,
    pub post_slug: String,
    pub content: String,
}
