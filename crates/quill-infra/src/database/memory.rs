//! In-memory repository implementations.
//!
//! Fallback when no database is configured, so the server can run in a
//! development mode. One store implements every repository port; data is
//! lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{MonthlyStat, Post, PostStatus, PushSubscription, Subscriber, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    PostRepository, PushSubscriptionRepository, StatsRepository, SubscriberRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    posts: HashMap<Uuid, Post>,
    users: HashMap<Uuid, User>,
    stats: HashMap<(Uuid, String), MonthlyStat>,
    subscribers: HashMap<Uuid, Subscriber>,
    push_subscriptions: HashMap<Uuid, PushSubscription>,
}

/// Process-local store backing every repository port.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .posts
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.values().any(|p| p.slug == post.slug) {
            return Err(RepoError::Constraint(format!(
                "duplicate slug '{}'",
                post.slug
            )));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn list_by_status(
        &self,
        status: PostStatus,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(posts, limit, offset))
    }

    async fn list_public_by_author(
        &self,
        author_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.author_id == author_id && p.status.is_public())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(posts, limit, offset))
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.views += 1;
        Ok(post.views)
    }

    async fn increment_likes(&self, id: Uuid) -> Result<i64, RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.likes += 1;
        Ok(post.likes)
    }

    async fn decrement_likes(&self, id: Uuid) -> Result<Option<i64>, RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        if post.likes == 0 {
            return Ok(None);
        }
        post.likes -= 1;
        Ok(Some(post.likes))
    }
}

#[async_trait]
impl StatsRepository for InMemoryStore {
    async fn bump(
        &self,
        post_id: Uuid,
        month: &str,
        views_delta: i64,
        likes_delta: i64,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let stat = tables
            .stats
            .entry((post_id, month.to_string()))
            .or_insert_with(|| MonthlyStat {
                post_id,
                month: month.to_string(),
                views: 0,
                likes: 0,
            });
        stat.views += views_delta;
        stat.likes += likes_delta;
        Ok(())
    }

    async fn for_post(&self, post_id: Uuid) -> Result<Vec<MonthlyStat>, RepoError> {
        let tables = self.tables.read().await;
        let mut stats: Vec<MonthlyStat> = tables
            .stats
            .values()
            .filter(|s| s.post_id == post_id)
            .cloned()
            .collect();
        stats.sort_by(|a, b| b.month.cmp(&a.month));
        Ok(stats)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint(format!(
                "duplicate email '{}'",
                user.email
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SubscriberRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .subscribers
            .values()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn insert(&self, sub: Subscriber) -> Result<Subscriber, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.subscribers.values().any(|s| s.email == sub.email) {
            return Err(RepoError::Constraint(format!(
                "duplicate email '{}'",
                sub.email
            )));
        }
        tables.subscribers.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn delete_by_email(&self, email: &str) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .subscribers
            .values()
            .find(|s| s.email == email)
            .map(|s| s.id)
            .ok_or(RepoError::NotFound)?;
        tables.subscribers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PushSubscriptionRepository for InMemoryStore {
    async fn find_by_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<PushSubscription>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .push_subscriptions
            .values()
            .find(|s| s.endpoint == endpoint)
            .cloned())
    }

    async fn insert(&self, sub: PushSubscription) -> Result<PushSubscription, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .push_subscriptions
            .values()
            .any(|s| s.endpoint == sub.endpoint)
        {
            return Err(RepoError::Constraint("duplicate endpoint".to_string()));
        }
        tables.push_subscriptions.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .push_subscriptions
            .values()
            .find(|s| s.endpoint == endpoint)
            .map(|s| s.id)
            .ok_or(RepoError::NotFound)?;
        tables.push_subscriptions.remove(&id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .push_subscriptions
            .values()
            .cloned()
            .collect())
    }
}

fn page(rows: Vec<Post>, limit: u64, offset: u64) -> Vec<Post> {
    rows.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(slug: &str, status: PostStatus) -> Post {
        let mut p = Post::new(
            Uuid::new_v4(),
            slug.to_string(),
            slug.to_string(),
            "body".to_string(),
            "general".to_string(),
        );
        p.status = status;
        p
    }

    #[tokio::test]
    async fn slug_uniqueness_enforced_on_insert() {
        let store = InMemoryStore::new();
        PostRepository::insert(&store, post("taken", PostStatus::Draft))
            .await
            .unwrap();

        let err = PostRepository::insert(&store, post("taken", PostStatus::Draft))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn decrement_clamps_at_zero() {
        let store = InMemoryStore::new();
        let p = PostRepository::insert(&store, post("p", PostStatus::Approved))
            .await
            .unwrap();

        assert_eq!(store.increment_likes(p.id).await.unwrap(), 1);
        assert_eq!(store.decrement_likes(p.id).await.unwrap(), Some(0));
        assert_eq!(store.decrement_likes(p.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bump_upserts_rollup() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();

        store.bump(id, "2025-03", 1, 0).await.unwrap();
        store.bump(id, "2025-03", 1, 1).await.unwrap();
        store.bump(id, "2025-04", 0, 1).await.unwrap();

        let stats = store.for_post(id).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].month, "2025-04");
        assert_eq!(stats[1].views, 2);
        assert_eq!(stats[1].likes, 1);
    }
}
