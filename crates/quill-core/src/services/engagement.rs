//! Engagement counters: views, likes, and the monthly rollup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{MonthlyStat, month_key};
use crate::error::DomainError;
use crate::ports::{Cache, PostRepository, StatsRepository};
use crate::services::{invalidate_pages, resolve_post};

/// Counter values after an engagement operation. The counter the operation
/// touched is the freshly returned value; the other one is the value read
/// during resolution.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementSnapshot {
    pub post_id: Uuid,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
}

/// Records views, likes and unlikes against a post and mirrors each event
/// into the per-month rollup.
///
/// The post-counter update and the rollup upsert are two separate writes
/// with no cross-document transaction. Each statement is atomic on its own,
/// but a crash between them leaves the rollup under-counted relative to the
/// canonical counter. That drift is accepted, not repaired.
pub struct EngagementService {
    posts: Arc<dyn PostRepository>,
    stats: Arc<dyn StatsRepository>,
    cache: Arc<dyn Cache>,
}

impl EngagementService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        stats: Arc<dyn StatsRepository>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            posts,
            stats,
            cache,
        }
    }

    /// Record one view. The rollup row for `month_key(as_of)` is created
    /// with count 1 on the first event of that month.
    pub async fn record_view(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;

        let views = self.posts.increment_views(post.id).await?;
        self.stats
            .bump(post.id, &month_key(as_of), 1, 0)
            .await?;

        tracing::debug!(post_id = %post.id, views, "View recorded");
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(EngagementSnapshot {
            post_id: post.id,
            slug: post.slug,
            views,
            likes: post.likes,
        })
    }

    /// Record one like.
    pub async fn record_like(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;

        let likes = self.posts.increment_likes(post.id).await?;
        self.stats
            .bump(post.id, &month_key(as_of), 0, 1)
            .await?;

        tracing::debug!(post_id = %post.id, likes, "Like recorded");
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(EngagementSnapshot {
            post_id: post.id,
            slug: post.slug,
            views: post.views,
            likes,
        })
    }

    /// Remove one like. Fails with `AlreadyAtBoundary` when the counter is
    /// already zero; the decrement itself is guarded so a raced-away like
    /// can never push the stored value below zero. The rollup decrement is
    /// deliberately unguarded and may go negative under the same race.
    pub async fn record_unlike(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;

        if post.likes == 0 {
            return Err(DomainError::AlreadyAtBoundary { counter: "likes" });
        }

        let likes = self
            .posts
            .decrement_likes(post.id)
            .await?
            .ok_or(DomainError::AlreadyAtBoundary { counter: "likes" })?;

        self.stats
            .bump(post.id, &month_key(as_of), 0, -1)
            .await?;

        tracing::debug!(post_id = %post.id, likes, "Like removed");
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(EngagementSnapshot {
            post_id: post.id,
            slug: post.slug,
            views: post.views,
            likes,
        })
    }

    /// The monthly rollup history for a post, newest month first.
    pub async fn monthly_stats(&self, target: &str) -> Result<Vec<MonthlyStat>, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;
        Ok(self.stats.for_post(post.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Post, PostStatus};
    use crate::services::testing::{MemCache, MemPosts, MemStats};
    use chrono::TimeZone;

    fn sample_post(slug: &str, likes: i64) -> Post {
        let mut post = Post::new(
            Uuid::new_v4(),
            slug.to_string(),
            "Hello".to_string(),
            "World".to_string(),
            "general".to_string(),
        );
        post.status = PostStatus::Approved;
        post.likes = likes;
        post
    }

    fn service(posts: Arc<MemPosts>, stats: Arc<MemStats>) -> EngagementService {
        EngagementService::new(posts, stats, Arc::new(MemCache::default()))
    }

    fn march() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn view_creates_rollup_then_increments() {
        let post = sample_post("hello-world", 0);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let stats = Arc::new(MemStats::default());
        let svc = service(posts.clone(), stats.clone());

        let first = svc.record_view("hello-world", march()).await.unwrap();
        assert_eq!(first.views, 1);
        assert_eq!(stats.get(post_id, "2025-03"), Some((1, 0)));

        let second = svc.record_view("hello-world", march()).await.unwrap();
        assert_eq!(second.views, 2);
        assert_eq!(stats.get(post_id, "2025-03"), Some((2, 0)));
    }

    #[tokio::test]
    async fn month_attribution_follows_as_of() {
        let post = sample_post("seasonal", 0);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let stats = Arc::new(MemStats::default());
        let svc = service(posts, stats.clone());

        svc.record_view("seasonal", march()).await.unwrap();
        let april = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        svc.record_view("seasonal", april).await.unwrap();

        assert_eq!(stats.get(post_id, "2025-03"), Some((1, 0)));
        assert_eq!(stats.get(post_id, "2025-04"), Some((1, 0)));
    }

    #[tokio::test]
    async fn like_bumps_post_and_rollup() {
        let post = sample_post("hello-world", 3);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let stats = Arc::new(MemStats::default());
        let svc = service(posts.clone(), stats.clone());

        let snapshot = svc.record_like("hello-world", march()).await.unwrap();
        assert_eq!(snapshot.likes, 4);
        assert_eq!(posts.get(post_id).unwrap().likes, 4);
        assert_eq!(stats.get(post_id, "2025-03"), Some((0, 1)));
    }

    #[tokio::test]
    async fn unlike_at_zero_reports_boundary_and_changes_nothing() {
        let post = sample_post("quiet", 0);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let stats = Arc::new(MemStats::default());
        let svc = service(posts.clone(), stats.clone());

        let err = svc.record_unlike("quiet", march()).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyAtBoundary { .. }));
        assert_eq!(posts.get(post_id).unwrap().likes, 0);
        assert_eq!(stats.get(post_id, "2025-03"), None);
    }

    #[tokio::test]
    async fn likes_never_go_negative() {
        let post = sample_post("busy", 2);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let stats = Arc::new(MemStats::default());
        let svc = service(posts.clone(), stats.clone());

        svc.record_unlike("busy", march()).await.unwrap();
        let snapshot = svc.record_unlike("busy", march()).await.unwrap();
        assert_eq!(snapshot.likes, 0);

        let err = svc.record_unlike("busy", march()).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyAtBoundary { .. }));
        assert_eq!(posts.get(post_id).unwrap().likes, 0);
        assert_eq!(stats.get(post_id, "2025-03"), Some((0, -2)));
    }

    #[tokio::test]
    async fn target_accepts_id_and_slug() {
        let post = sample_post("by-either", 0);
        let post_id = post.id;
        let posts = Arc::new(MemPosts::with([post]));
        let svc = service(posts, Arc::new(MemStats::default()));

        svc.record_view(&post_id.to_string(), march()).await.unwrap();
        let snapshot = svc.record_view("by-either", march()).await.unwrap();
        assert_eq!(snapshot.views, 2);
    }

    #[tokio::test]
    async fn malformed_target_is_invalid_argument() {
        let svc = service(Arc::new(MemPosts::default()), Arc::new(MemStats::default()));

        let err = svc.record_view("not a slug!", march()).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let svc = service(Arc::new(MemPosts::default()), Arc::new(MemStats::default()));

        let err = svc.record_view("missing", march()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleted_post_behaves_as_absent() {
        let mut post = sample_post("gone", 5);
        post.status = PostStatus::Deleted;
        let posts = Arc::new(MemPosts::with([post]));
        let svc = service(posts, Arc::new(MemStats::default()));

        let err = svc.record_like("gone", march()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn counter_changes_invalidate_rendered_pages() {
        let post = sample_post("cached", 0);
        let author_id = post.author_id;
        let posts = Arc::new(MemPosts::with([post]));
        let cache = Arc::new(MemCache::default());
        let svc = EngagementService::new(posts, Arc::new(MemStats::default()), cache.clone());

        svc.record_view("cached", march()).await.unwrap();

        let deleted = cache.deleted.lock().unwrap().clone();
        assert!(deleted.contains(&"page:post:cached".to_string()));
        assert!(deleted.contains(&"page:posts:index".to_string()));
        assert!(deleted.contains(&format!("page:author:{author_id}")));
    }
}
