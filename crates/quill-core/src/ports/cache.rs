use async_trait::async_trait;
use std::time::Duration;

use crate::domain::Post;

/// Cache trait - abstraction over caching backends (Redis, in-memory).
/// Used for rendered-page caching; engagement updates invalidate through it.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> bool;
}

/// Cache keys for every rendered view that can show a post's counters:
/// the detail page, the public listing, and the author profile.
pub fn post_page_keys(post: &Post) -> [String; 3] {
    [
        format!("page:post:{}", post.slug),
        "page:posts:index".to_string(),
        format!("page:author:{}", post.author_id),
    ]
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
