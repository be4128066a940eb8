//! Admin moderation surface. Every handler here requires the admin role.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use quill_core::domain::PostStatus;
use quill_shared::ApiResponse;

use crate::handlers::posts::{confirmation, post_response, responses};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn require_admin(identity: &Identity) -> AppResult<()> {
    if !identity.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// GET /api/admin/posts - posts by status; the moderation queue by default.
pub async fn list_posts(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<ModerationQuery>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let status = match query.status.as_deref() {
        Some(raw) => PostStatus::parse(raw)?,
        None => PostStatus::PendingReview,
    };
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);

    let posts = state.posts.list_by_status(status, limit, offset).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(responses(posts))))
}

/// POST /api/admin/posts/{target}/approve
pub async fn approve(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let outcome = state
        .lifecycle
        .transition(&identity.principal(), &path, PostStatus::Approved)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&outcome.post),
        confirmation("Post approved", outcome.by_admin),
    )))
}

/// POST /api/admin/posts/{target}/reject
pub async fn reject(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let outcome = state
        .lifecycle
        .transition(&identity.principal(), &path, PostStatus::Rejected)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&outcome.post),
        confirmation("Post rejected", outcome.by_admin),
    )))
}
