//! Slug generation and allocation
//!
//! Turns a user-supplied title into a unique, URL-safe, permanent post
//! identifier. Two steps:
//!
//! 1. [`slugify`] derives a normalized, human-readable base from the title.
//! 2. [`SlugAllocator::allocate`] disambiguates the base with a random
//!    6-digit suffix, retrying against the store until it finds a free
//!    candidate or gives up and falls back to a longer random id.
//!
//! The allocator's existence checks are advisory: the UNIQUE constraint on
//! `posts.slug` is what actually guarantees uniqueness, and the post service
//! re-allocates when an insert loses that race.

use crate::db::repositories::PostRepository;
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Base used when normalization strips the whole title
pub const FALLBACK_BASE: &str = "untitled-post";

/// How many random numeric suffixes to try before falling back
pub const MAX_NUMERIC_ATTEMPTS: usize = 50;

/// Length of the fallback random suffix
pub const FALLBACK_SUFFIX_LEN: usize = 8;

/// Numeric suffix range (inclusive): always six digits
const SUFFIX_MIN: u32 = 100_000;
const SUFFIX_MAX: u32 = 999_999;

/// Alphabet for the fallback suffix
const URL_SAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Normalize a title into a URL-safe base slug.
///
/// Lowercases, folds accented characters to their unaccented base letters,
/// drops everything that is not `[a-z0-9 -]`, turns whitespace runs into
/// single hyphens, collapses hyphen runs, and trims. A title with nothing
/// left after normalization maps to [`FALLBACK_BASE`].
pub fn slugify(title: &str) -> String {
    let folded: String = title
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ' || *c == '-')
        .collect();

    // Whitespace runs become single hyphens
    let hyphenated = folded
        .split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    // Collapse hyphen runs
    let mut slug = String::with_capacity(hyphenated.len());
    let mut prev_hyphen = false;
    for c in hyphenated.chars() {
        if c == '-' {
            if !prev_hyphen {
                slug.push('-');
            }
            prev_hyphen = true;
        } else {
            slug.push(c);
            prev_hyphen = false;
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        slug.to_string()
    }
}

/// Random suffix from the URL-safe alphabet, used when numeric attempts run out
fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| URL_SAFE_ALPHABET[rng.gen_range(0..URL_SAFE_ALPHABET.len())] as char)
        .collect()
}

/// Allocates unique slugs against the post store.
pub struct SlugAllocator {
    posts: Arc<dyn PostRepository>,
}

impl SlugAllocator {
    /// Create a new allocator over the given post repository
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Allocate a slug for the given title.
    ///
    /// Draws up to [`MAX_NUMERIC_ATTEMPTS`] random 6-digit suffixes,
    /// accepting the first candidate the store does not already contain.
    /// The checks are sequential: each draw depends on the previous one
    /// having collided.
    ///
    /// If every attempt collides, returns `base-<8 random chars>` without a
    /// further store check; the insert-time UNIQUE constraint covers the
    /// remaining collision window.
    pub async fn allocate(&self, title: &str) -> Result<String> {
        let base = slugify(title);

        for _ in 0..MAX_NUMERIC_ATTEMPTS {
            let suffix = rand::thread_rng().gen_range(SUFFIX_MIN..=SUFFIX_MAX);
            let candidate = format!("{}-{}", base, suffix);
            let taken = self
                .posts
                .exists_by_slug(&candidate)
                .await
                .context("Failed to check slug candidate")?;
            if !taken {
                return Ok(candidate);
            }
        }

        let fallback = format!("{}-{}", base, random_suffix(FALLBACK_SUFFIX_LEN));
        tracing::warn!(
            slug = %fallback,
            "Numeric slug suffixes exhausted, using random fallback"
        );
        Ok(fallback)
    }
}
