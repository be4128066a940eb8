//! Post lifecycle: creation, editing, status transitions, soft deletion.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    DomainEvent, Post, PostStatus, Principal, can_mutate, is_valid_slug, slugify,
};
use crate::error::DomainError;
use crate::ports::{Cache, PostRepository, PubSub};
use crate::services::{invalidate_pages, publish_event, resolve_post};

/// Fields accepted when creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: String,
    pub language: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
}

/// Partial update for the general edit path. Absent fields stay untouched.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub slug: Option<String>,
}

/// Result of a mutating lifecycle operation. `by_admin` is true when an
/// admin touched someone else's post; it feeds the confirmation message
/// only and is not persisted anywhere.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub post: Post,
    pub by_admin: bool,
}

/// The post lifecycle service. Every mutating operation runs the same
/// authorization predicate: author of the post, or admin.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    cache: Arc<dyn Cache>,
    events: Arc<dyn PubSub>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        cache: Arc<dyn Cache>,
        events: Arc<dyn PubSub>,
    ) -> Self {
        Self {
            posts,
            cache,
            events,
        }
    }

    /// Create a post owned by the principal. The slug is derived from the
    /// title when not supplied; a supplied slug must match the slug grammar
    /// and must not be owned by any other post.
    pub async fn create(&self, principal: &Principal, new: NewPost) -> Result<Post, DomainError> {
        require_non_empty("title", &new.title)?;
        require_non_empty("content", &new.content)?;
        require_non_empty("category", &new.category)?;
        let language = new.language.unwrap_or_else(|| "en".to_string());
        require_non_empty("language", &language)?;

        let slug = match new.slug {
            Some(slug) => {
                if !is_valid_slug(&slug) {
                    return Err(DomainError::invalid(format!("invalid slug '{slug}'")));
                }
                slug
            }
            None => {
                let derived = slugify(&new.title);
                if derived.is_empty() {
                    format!("post-{}", Uuid::new_v4().simple())
                } else {
                    derived
                }
            }
        };

        if self.posts.slug_taken(&slug, None).await? {
            return Err(DomainError::Conflict(format!(
                "slug '{slug}' is already in use"
            )));
        }

        let status = new.status.unwrap_or_default();
        if !matches!(
            status,
            PostStatus::Draft | PostStatus::PendingReview | PostStatus::Approved
        ) {
            return Err(DomainError::invalid(format!(
                "posts cannot be created as '{}'",
                status.as_str()
            )));
        }

        let mut post = Post::new(principal.user_id, slug, new.title, new.content, new.category);
        post.language = language;
        post.excerpt = new.excerpt;
        post.tags = new.tags;
        post.status = status;

        let post = self.posts.insert(post).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, status = %post.status.as_str(), "Post created");

        self.emit_status_event(&post).await;
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(post)
    }

    /// General edit path. Validates every supplied required field and the
    /// slug grammar/uniqueness; does not change status.
    pub async fn update(
        &self,
        principal: &Principal,
        target: &str,
        patch: PostPatch,
    ) -> Result<MutationOutcome, DomainError> {
        let mut post = resolve_post(self.posts.as_ref(), target).await?;
        let by_admin = self.authorize(principal, &post)?;
        let old_slug = post.slug.clone();

        if let Some(title) = patch.title {
            require_non_empty("title", &title)?;
            post.title = title;
        }
        if let Some(content) = patch.content {
            require_non_empty("content", &content)?;
            post.content = content;
        }
        if let Some(category) = patch.category {
            require_non_empty("category", &category)?;
            post.category = category;
        }
        if let Some(language) = patch.language {
            require_non_empty("language", &language)?;
            post.language = language;
        }
        if let Some(excerpt) = patch.excerpt {
            post.excerpt = Some(excerpt);
        }
        if let Some(tags) = patch.tags {
            post.tags = tags;
        }
        if let Some(slug) = patch.slug {
            if !is_valid_slug(&slug) {
                return Err(DomainError::invalid(format!("invalid slug '{slug}'")));
            }
            if self.posts.slug_taken(&slug, Some(post.id)).await? {
                return Err(DomainError::Conflict(format!(
                    "slug '{slug}' is already in use"
                )));
            }
            post.slug = slug;
        }

        post.updated_at = Utc::now();
        let post = self.posts.update(post).await?;

        tracing::info!(post_id = %post.id, by_admin, "Post updated");

        // The old slug's detail page is stale after a re-slug.
        if old_slug != post.slug {
            if let Err(e) = self.cache.delete(&format!("page:post:{old_slug}")).await {
                tracing::warn!(slug = %old_slug, error = %e, "Cache invalidation failed");
            }
        }
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(MutationOutcome { post, by_admin })
    }

    /// Move a post to another status, enforcing the transition matrix.
    pub async fn transition(
        &self,
        principal: &Principal,
        target: &str,
        to: PostStatus,
    ) -> Result<MutationOutcome, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;
        let by_admin = self.authorize(principal, &post)?;

        if !post.status.can_transition(to) {
            return Err(DomainError::invalid(format!(
                "cannot move post from '{}' to '{}'",
                post.status.as_str(),
                to.as_str()
            )));
        }

        self.apply_status(post, to, by_admin).await
    }

    /// Publish shortcut: make the post publicly visible from any live
    /// state. Required-field checks belong to the create and general
    /// update paths and are not repeated here.
    pub async fn publish(
        &self,
        principal: &Principal,
        target: &str,
    ) -> Result<MutationOutcome, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;
        let by_admin = self.authorize(principal, &post)?;

        self.apply_status(post, PostStatus::Approved, by_admin).await
    }

    /// Soft delete: the row is kept, the status flag hides it everywhere.
    pub async fn delete(
        &self,
        principal: &Principal,
        target: &str,
    ) -> Result<MutationOutcome, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;
        let by_admin = self.authorize(principal, &post)?;

        self.apply_status(post, PostStatus::Deleted, by_admin).await
    }

    /// Fetch a post for reading. Non-public posts are only visible to
    /// their author and admins; everyone else sees them as absent.
    pub async fn get_for_read(
        &self,
        principal: Option<&Principal>,
        target: &str,
    ) -> Result<Post, DomainError> {
        let post = resolve_post(self.posts.as_ref(), target).await?;

        if post.status.is_public() {
            return Ok(post);
        }

        match principal {
            Some(p) if can_mutate(p, &post) => Ok(post),
            _ => Err(DomainError::not_found("post")),
        }
    }

    fn authorize(&self, principal: &Principal, post: &Post) -> Result<bool, DomainError> {
        if !can_mutate(principal, post) {
            return Err(DomainError::Forbidden);
        }
        Ok(principal.is_admin() && post.author_id != principal.user_id)
    }

    async fn apply_status(
        &self,
        mut post: Post,
        to: PostStatus,
        by_admin: bool,
    ) -> Result<MutationOutcome, DomainError> {
        let from = post.status;
        post.status = to;
        post.updated_at = Utc::now();
        let post = self.posts.update(post).await?;

        tracing::info!(
            post_id = %post.id,
            from = %from.as_str(),
            to = %to.as_str(),
            by_admin,
            "Post status changed"
        );

        self.emit_status_event(&post).await;
        invalidate_pages(self.cache.as_ref(), &post).await;

        Ok(MutationOutcome { post, by_admin })
    }

    async fn emit_status_event(&self, post: &Post) {
        let event = match post.status {
            PostStatus::PendingReview => DomainEvent::PostSubmitted {
                post_id: post.id,
                slug: post.slug.clone(),
                author_id: post.author_id,
            },
            PostStatus::Approved => DomainEvent::PostApproved {
                post_id: post.id,
                slug: post.slug.clone(),
                title: post.title.clone(),
            },
            PostStatus::Rejected => DomainEvent::PostRejected {
                post_id: post.id,
                slug: post.slug.clone(),
            },
            _ => return,
        };

        publish_event(self.events.as_ref(), &event).await;
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::services::testing::{MemBus, MemCache, MemPosts, MemStats};
    use crate::services::EngagementService;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "author@example.com".to_string(),
            role,
        }
    }

    fn service(posts: Arc<MemPosts>) -> (PostService, Arc<MemBus>) {
        let bus = Arc::new(MemBus::default());
        (
            PostService::new(posts, Arc::new(MemCache::default()), bus.clone()),
            bus,
        )
    }

    fn draft(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "Some body".to_string(),
            category: "general".to_string(),
            language: None,
            excerpt: None,
            tags: vec![],
            slug: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_derives_slug_and_defaults_to_draft() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);

        let post = svc.create(&author, draft("Hello, World!")).await.unwrap();
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.author_id, author.user_id);
        assert_eq!(post.language, "en");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_and_bad_slugs() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);

        let mut missing = draft("A title");
        missing.content = "  ".to_string();
        assert!(matches!(
            svc.create(&author, missing).await.unwrap_err(),
            DomainError::InvalidArgument(_)
        ));

        let mut bad_slug = draft("A title");
        bad_slug.slug = Some("Not A Slug".to_string());
        assert!(matches!(
            svc.create(&author, bad_slug).await.unwrap_err(),
            DomainError::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn slug_collision_is_conflict_but_own_slug_is_fine() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);

        svc.create(&author, draft("First post")).await.unwrap();

        let mut duplicate = draft("Another post");
        duplicate.slug = Some("first-post".to_string());
        assert!(matches!(
            svc.create(&author, duplicate).await.unwrap_err(),
            DomainError::Conflict(_)
        ));

        // Updating a post to the slug it already owns succeeds.
        let patch = PostPatch {
            slug: Some("first-post".to_string()),
            ..Default::default()
        };
        let outcome = svc.update(&author, "first-post", patch).await.unwrap();
        assert_eq!(outcome.post.slug, "first-post");
    }

    #[tokio::test]
    async fn strangers_are_forbidden_and_admins_are_tagged() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);
        let stranger = principal(Role::User);
        let admin = principal(Role::Admin);

        svc.create(&author, draft("Guarded post")).await.unwrap();

        let patch = PostPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(&stranger, "guarded-post", patch.clone())
                .await
                .unwrap_err(),
            DomainError::Forbidden
        ));

        let owner_outcome = svc
            .update(&author, "guarded-post", patch.clone())
            .await
            .unwrap();
        assert!(!owner_outcome.by_admin);

        let admin_outcome = svc.update(&admin, "guarded-post", patch).await.unwrap();
        assert!(admin_outcome.by_admin);
    }

    #[tokio::test]
    async fn transition_walks_review_flow_and_emits_events() {
        let (svc, bus) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);
        let admin = principal(Role::Admin);

        svc.create(&author, draft("Review me")).await.unwrap();
        svc.transition(&author, "review-me", PostStatus::PendingReview)
            .await
            .unwrap();
        let outcome = svc
            .transition(&admin, "review-me", PostStatus::Approved)
            .await
            .unwrap();
        assert_eq!(outcome.post.status, PostStatus::Approved);

        let published = bus.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert!(published[0].1.contains("post_submitted"));
        assert!(published[1].1.contains("post_approved"));
    }

    #[tokio::test]
    async fn illegal_transitions_are_rejected() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);

        svc.create(&author, draft("Stuck")).await.unwrap();

        assert!(matches!(
            svc.transition(&author, "stuck", PostStatus::Rejected)
                .await
                .unwrap_err(),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            svc.transition(&author, "stuck", PostStatus::Archived)
                .await
                .unwrap_err(),
            DomainError::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn publish_skips_field_revalidation() {
        let author = principal(Role::User);
        // A post whose category was never filled in, inserted behind the
        // validating create path.
        let mut post = Post::new(
            author.user_id,
            "rough-draft".to_string(),
            "Rough draft".to_string(),
            "body".to_string(),
            String::new(),
        );
        post.status = PostStatus::Draft;
        let posts = Arc::new(MemPosts::with([post]));
        let (svc, _) = service(posts);

        let outcome = svc.publish(&author, "rough-draft").await.unwrap();
        assert_eq!(outcome.post.status, PostStatus::Approved);
    }

    #[tokio::test]
    async fn delete_is_soft_and_terminal() {
        let posts = Arc::new(MemPosts::default());
        let (svc, _) = service(posts.clone());
        let author = principal(Role::User);

        let created = svc.create(&author, draft("Ephemeral")).await.unwrap();
        svc.delete(&author, "ephemeral").await.unwrap();

        // Row still exists with the deleted flag, but reads miss it.
        assert_eq!(posts.get(created.id).unwrap().status, PostStatus::Deleted);
        assert!(matches!(
            svc.get_for_read(Some(&author), "ephemeral").await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
        assert!(matches!(
            svc.publish(&author, "ephemeral").await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn non_public_posts_hidden_from_other_readers() {
        let (svc, _) = service(Arc::new(MemPosts::default()));
        let author = principal(Role::User);
        let stranger = principal(Role::User);
        let admin = principal(Role::Admin);

        svc.create(&author, draft("Hidden gem")).await.unwrap();

        assert!(svc.get_for_read(Some(&author), "hidden-gem").await.is_ok());
        assert!(svc.get_for_read(Some(&admin), "hidden-gem").await.is_ok());
        assert!(svc.get_for_read(None, "hidden-gem").await.is_err());
        assert!(svc.get_for_read(Some(&stranger), "hidden-gem").await.is_err());

        svc.publish(&author, "hidden-gem").await.unwrap();
        assert!(svc.get_for_read(None, "hidden-gem").await.is_ok());
    }

    #[tokio::test]
    async fn lifecycle_and_engagement_share_counters() {
        let posts = Arc::new(MemPosts::default());
        let (svc, _) = service(posts.clone());
        let author = principal(Role::User);

        let mut publishable = draft("Hello World");
        publishable.status = Some(PostStatus::Approved);
        svc.create(&author, publishable).await.unwrap();

        let engagement = EngagementService::new(
            posts,
            Arc::new(MemStats::default()),
            Arc::new(MemCache::default()),
        );
        let snapshot = engagement
            .record_like("hello-world", Utc::now())
            .await
            .unwrap();
        assert_eq!(snapshot.likes, 1);
    }
}
