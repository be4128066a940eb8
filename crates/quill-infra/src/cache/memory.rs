//! In-memory cache implementation - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        self.expires_at.map(|exp| Instant::now() > exp).unwrap_or(false)
    }
}

/// In-memory cache over a HashMap with an async RwLock.
///
/// Holds rendered-page bodies in the database-less development mode.
/// Data is lost on process restart.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if entry.expired() {
            drop(store);
            self.store.write().await.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::Post;
    use quill_core::ports::post_page_keys;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new();
        cache.set("page:posts:index", "<html>", None).await.unwrap();
        assert_eq!(
            cache.get("page:posts:index").await,
            Some("<html>".to_string())
        );

        cache.delete("page:posts:index").await.unwrap();
        assert_eq!(cache.get("page:posts:index").await, None);
    }

    #[tokio::test]
    async fn expired_entries_vanish() {
        let cache = InMemoryCache::new();
        cache
            .set("short-lived", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("short-lived").await, None);
    }

    #[tokio::test]
    async fn page_keys_round_trip() {
        let cache = InMemoryCache::new();
        let post = Post::new(
            uuid::Uuid::new_v4(),
            "cached-post".to_string(),
            "Cached".to_string(),
            "body".to_string(),
            "general".to_string(),
        );

        for key in post_page_keys(&post) {
            cache.set(&key, "rendered", None).await.unwrap();
            assert!(cache.exists(&key).await);
            cache.delete(&key).await.unwrap();
            assert!(!cache.exists(&key).await);
        }
    }
}
