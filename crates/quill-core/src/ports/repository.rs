use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{MonthlyStat, Post, PostStatus, PushSubscription, Subscriber, User};
use crate::error::RepoError;

/// Post repository. Counter updates are atomic at the statement level;
/// callers sequence them with the monthly rollup writes.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Whether another post (excluding `exclude`) already owns this slug.
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError>;

    async fn insert(&self, post: Post) -> Result<Post, RepoError>;

    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    async fn list_by_status(
        &self,
        status: PostStatus,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Public posts by one author, newest first.
    async fn list_public_by_author(
        &self,
        author_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Atomically add 1 to the view counter, returning the new value.
    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError>;

    /// Atomically add 1 to the like counter, returning the new value.
    async fn increment_likes(&self, id: Uuid) -> Result<i64, RepoError>;

    /// Atomically subtract 1 from the like counter, guarded so the stored
    /// value never drops below zero. Returns `None` when the guard
    /// prevented the decrement.
    async fn decrement_likes(&self, id: Uuid) -> Result<Option<i64>, RepoError>;
}

/// Monthly rollup repository.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Upsert the `(post, month)` row, adding the deltas. The row is
    /// created with the delta values when absent. A single statement,
    /// atomic on its own but deliberately not transactional with the
    /// post-counter write.
    async fn bump(
        &self,
        post_id: Uuid,
        month: &str,
        views_delta: i64,
        likes_delta: i64,
    ) -> Result<(), RepoError>;

    /// All rollup rows for a post, newest month first.
    async fn for_post(&self, post_id: Uuid) -> Result<Vec<MonthlyStat>, RepoError>;
}

/// User repository.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, RepoError>;

    async fn insert(&self, user: User) -> Result<User, RepoError>;

    async fn update(&self, user: User) -> Result<User, RepoError>;
}

/// Newsletter subscriber repository.
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, RepoError>;

    async fn insert(&self, subscriber: Subscriber) -> Result<Subscriber, RepoError>;

    async fn delete_by_email(&self, email: &str) -> Result<(), RepoError>;
}

/// Push subscription repository.
#[async_trait]
pub trait PushSubscriptionRepository: Send + Sync {
    async fn find_by_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<PushSubscription>, RepoError>;

    async fn insert(&self, sub: PushSubscription) -> Result<PushSubscription, RepoError>;

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), RepoError>;

    async fn list_all(&self) -> Result<Vec<PushSubscription>, RepoError>;
}
