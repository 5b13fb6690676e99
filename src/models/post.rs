//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
///
/// The slug is allocated once at creation time and never changes; edits to
/// the title do not touch it, so published URLs stay stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL key, globally unique and immutable once assigned
    pub slug: String,
    /// Post title
    pub title: String,
    /// Markdown content (stored raw, rendered client-side)
    pub content: String,
    /// Author user ID (weak reference)
    pub author_id: i64,
    /// Category name
    pub category: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Post list item with author display name and a content excerpt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub author_id: i64,
    pub author_name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Maximum excerpt length in characters
const EXCERPT_MAX_CHARS: usize = 200;

impl PostSummary {
    /// Derive a plain-text excerpt from markdown content.
    pub fn excerpt_of(content: &str) -> String {
        let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= EXCERPT_MAX_CHARS {
            return flat;
        }
        let cut: String = flat.chars().take(EXCERPT_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Input for creating a post. The slug is allocated by the service, not
/// supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub category: String,
}

/// Input for updating a post (slug intentionally absent)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_content_unchanged() {
        assert_eq!(PostSummary::excerpt_of("Hello world"), "Hello world");
    }

    #[test]
    fn test_excerpt_collapses_whitespace() {
        assert_eq!(
            PostSummary::excerpt_of("Hello\n\nworld  again"),
            "Hello world again"
        );
    }

    #[test]
    fn test_excerpt_truncates_long_content() {
        let long = "word ".repeat(100);
        let excerpt = PostSummary::excerpt_of(&long);
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }
}
