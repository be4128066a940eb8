//! Post lifecycle handlers.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use quill_core::domain::{Post, PostStatus, can_mutate};
use quill_core::services::{NewPost, PostPatch};
use quill_shared::ApiResponse;
use quill_shared::dto::{CreatePostRequest, PostResponse, TransitionRequest, UpdatePostRequest};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListQuery {
    fn page(&self) -> (u64, u64) {
        (
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            self.offset.unwrap_or(0),
        )
    }
}

/// GET /api/posts - public listing, approved posts only.
pub async fn list_public(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.page();

    let posts = state
        .posts
        .list_by_status(PostStatus::Approved, limit, offset)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(responses(posts))))
}

/// GET /api/authors/{id}/posts - an author's public posts.
pub async fn list_by_author(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.page();

    let posts = state
        .posts
        .list_public_by_author(path.into_inner(), limit, offset)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(responses(posts))))
}

/// GET /api/posts/{target} - detail by id or slug. Non-public posts are
/// visible to their author and admins only.
pub async fn get(
    state: web::Data<AppState>,
    path: web::Path<String>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let principal = identity.0.map(|i| i.principal());

    let post = state
        .lifecycle
        .get_for_read(principal.as_ref(), &path)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(&post))))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let status = match req.status.as_deref() {
        Some(raw) => Some(PostStatus::parse(raw)?),
        None => None,
    };

    let post = state
        .lifecycle
        .create(
            &identity.principal(),
            NewPost {
                title: req.title,
                content: req.content,
                category: req.category,
                language: req.language,
                excerpt: req.excerpt,
                tags: req.tags,
                slug: req.slug,
                status,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        post_response(&post),
        "Post created",
    )))
}

/// PUT /api/posts/{target}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let outcome = state
        .lifecycle
        .update(
            &identity.principal(),
            &path,
            PostPatch {
                title: req.title,
                content: req.content,
                category: req.category,
                language: req.language,
                excerpt: req.excerpt,
                tags: req.tags,
                slug: req.slug,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&outcome.post),
        confirmation("Post updated", outcome.by_admin),
    )))
}

/// POST /api/posts/{target}/status
pub async fn transition(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<TransitionRequest>,
) -> AppResult<HttpResponse> {
    let to = PostStatus::parse(&body.status)?;

    let outcome = state
        .lifecycle
        .transition(&identity.principal(), &path, to)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&outcome.post),
        confirmation(&format!("Post moved to {}", to.as_str()), outcome.by_admin),
    )))
}

/// POST /api/posts/{target}/publish
pub async fn publish(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let outcome = state
        .lifecycle
        .publish(&identity.principal(), &path)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&outcome.post),
        confirmation("Post published", outcome.by_admin),
    )))
}

/// DELETE /api/posts/{target}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let outcome = state
        .lifecycle
        .delete(&identity.principal(), &path)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message_only(confirmation(
        "Post deleted",
        outcome.by_admin,
    ))))
}

/// Admin-initiated changes to someone else's post are tagged in the
/// confirmation message; nothing durable records the distinction.
pub(crate) fn confirmation(base: &str, by_admin: bool) -> String {
    if by_admin {
        format!("{base} (admin)")
    } else {
        base.to_string()
    }
}

pub(crate) fn post_response(post: &Post) -> PostResponse {
    PostResponse {
        id: post.id.to_string(),
        slug: post.slug.clone(),
        title: post.title.clone(),
        content: post.content.clone(),
        excerpt: post.excerpt.clone(),
        category: post.category.clone(),
        language: post.language.clone(),
        tags: post.tags.clone(),
        status: post.status.as_str().to_string(),
        author_id: post.author_id.to_string(),
        likes: post.likes,
        views: post.views,
        created_at: post.created_at.to_rfc3339(),
        updated_at: post.updated_at.to_rfc3339(),
    }
}

pub(crate) fn responses(posts: Vec<Post>) -> Vec<PostResponse> {
    posts.iter().map(post_response).collect()
}

/// Shared owner-or-admin check for read-side endpoints that expose more
/// than the public surface.
pub(crate) fn require_can_mutate(identity: &Identity, post: &Post) -> AppResult<()> {
    if !can_mutate(&identity.principal(), post) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
