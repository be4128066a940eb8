//! Domain services - the post lifecycle and the engagement counters.
//!
//! Services orchestrate repositories, the cache, and the event bus through
//! ports only; each public operation is one unit of work triggered by a
//! request, with no cross-request coordination and no domain-level retries.

mod engagement;
mod lifecycle;

pub use engagement::{EngagementService, EngagementSnapshot};
pub use lifecycle::{MutationOutcome, NewPost, PostPatch, PostService};

use crate::domain::{DomainEvent, Post, PostRef, PostStatus};
use crate::error::DomainError;
use crate::ports::{Cache, PostRepository, PubSub, post_page_keys};

/// Resolve a consumer-supplied identifier (primary key or slug) to a live
/// post. Soft-deleted posts behave as absent everywhere.
pub(crate) async fn resolve_post(
    posts: &dyn PostRepository,
    target: &str,
) -> Result<Post, DomainError> {
    let found = match PostRef::parse(target)? {
        PostRef::Id(id) => posts.find_by_id(id).await?,
        PostRef::Slug(slug) => posts.find_by_slug(&slug).await?,
    };

    found
        .filter(|p| p.status != PostStatus::Deleted)
        .ok_or(DomainError::not_found("post"))
}

/// Drop every cached rendering that could show this post's state or
/// counters. Failures are logged and swallowed; staleness is preferable to
/// failing the triggering operation.
pub(crate) async fn invalidate_pages(cache: &dyn Cache, post: &Post) {
    for key in post_page_keys(post) {
        if let Err(e) = cache.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }
}

/// Publish a domain event, fire-and-forget.
pub(crate) async fn publish_event(bus: &dyn PubSub, event: &DomainEvent) {
    let payload = match serde_json::to_string(event) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize domain event");
            return;
        }
    };

    if let Err(e) = bus.publish(event.channel(), &payload).await {
        tracing::warn!(channel = %event.channel(), error = %e, "Event publish failed");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Instrumented in-memory fakes shared by the service tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::domain::{MonthlyStat, Post, PostStatus};
    use crate::error::RepoError;
    use crate::ports::{
        Cache, CacheError, MessageHandler, PostRepository, PubSub, PubSubError, StatsRepository,
    };

    #[derive(Default)]
    pub struct MemPosts {
        pub rows: Mutex<HashMap<Uuid, Post>>,
    }

    impl MemPosts {
        pub fn with(posts: impl IntoIterator<Item = Post>) -> Self {
            Self {
                rows: Mutex::new(posts.into_iter().map(|p| (p.id, p)).collect()),
            }
        }

        pub fn get(&self, id: Uuid) -> Option<Post> {
            self.rows.lock().unwrap().get(&id).cloned()
        }
    }

    #[async_trait]
    impl PostRepository for MemPosts {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|p| p.slug == slug)
                .cloned())
        }

        async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .any(|p| p.slug == slug && Some(p.id) != exclude))
        }

        async fn insert(&self, post: Post) -> Result<Post, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.values().any(|p| p.slug == post.slug) {
                return Err(RepoError::Constraint("slug already exists".into()));
            }
            rows.insert(post.id, post.clone());
            Ok(post)
        }

        async fn update(&self, post: Post) -> Result<Post, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            if !rows.contains_key(&post.id) {
                return Err(RepoError::NotFound);
            }
            rows.insert(post.id, post.clone());
            Ok(post)
        }

        async fn list_by_status(
            &self,
            status: PostStatus,
            limit: u64,
            offset: u64,
        ) -> Result<Vec<Post>, RepoError> {
            let mut posts: Vec<Post> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.status == status)
                .cloned()
                .collect();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(posts
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn list_public_by_author(
            &self,
            author_id: Uuid,
            limit: u64,
            offset: u64,
        ) -> Result<Vec<Post>, RepoError> {
            let mut posts: Vec<Post> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.author_id == author_id && p.status.is_public())
                .cloned()
                .collect();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(posts
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let post = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
            post.views += 1;
            Ok(post.views)
        }

        async fn increment_likes(&self, id: Uuid) -> Result<i64, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let post = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
            post.likes += 1;
            Ok(post.likes)
        }

        async fn decrement_likes(&self, id: Uuid) -> Result<Option<i64>, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let post = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
            if post.likes == 0 {
                return Ok(None);
            }
            post.likes -= 1;
            Ok(Some(post.likes))
        }
    }

    #[derive(Default)]
    pub struct MemStats {
        pub rows: Mutex<HashMap<(Uuid, String), (i64, i64)>>,
    }

    impl MemStats {
        pub fn get(&self, post_id: Uuid, month: &str) -> Option<(i64, i64)> {
            self.rows
                .lock()
                .unwrap()
                .get(&(post_id, month.to_string()))
                .copied()
        }
    }

    #[async_trait]
    impl StatsRepository for MemStats {
        async fn bump(
            &self,
            post_id: Uuid,
            month: &str,
            views_delta: i64,
            likes_delta: i64,
        ) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let entry = rows.entry((post_id, month.to_string())).or_insert((0, 0));
            entry.0 += views_delta;
            entry.1 += likes_delta;
            Ok(())
        }

        async fn for_post(&self, post_id: Uuid) -> Result<Vec<MonthlyStat>, RepoError> {
            let mut stats: Vec<MonthlyStat> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|((id, _), _)| *id == post_id)
                .map(|((_, month), (views, likes))| MonthlyStat {
                    post_id,
                    month: month.clone(),
                    views: *views,
                    likes: *likes,
                })
                .collect();
            stats.sort_by(|a, b| b.month.cmp(&a.month));
            Ok(stats)
        }
    }

    /// Cache fake that records which keys were invalidated.
    #[derive(Default)]
    pub struct MemCache {
        pub deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Cache for MemCache {
        async fn get(&self, _key: &str) -> Option<String> {
            None
        }

        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn exists(&self, _key: &str) -> bool {
            false
        }
    }

    /// Event bus fake that records published payloads.
    #[derive(Default)]
    pub struct MemBus {
        pub published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PubSub for MemBus {
        async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
            self.published
                .lock()
                .unwrap()
                .push((channel.to_string(), message.to_string()));
            Ok(())
        }

        async fn subscribe(
            &self,
            _channel: &str,
            _handler: MessageHandler,
        ) -> Result<(), PubSubError> {
            Ok(())
        }

        async fn unsubscribe(&self, _channel: &str) -> Result<(), PubSubError> {
            Ok(())
        }
    }
}
