//! Engagement handlers: views, likes, and the monthly rollup.
//!
//! The month a counter event lands in is taken from the wall clock at the
//! moment the request is handled; the services take it as an explicit
//! argument so tests can pin it.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use quill_core::services::EngagementSnapshot;
use quill_shared::ApiResponse;
use quill_shared::dto::{EngagementResponse, MonthlyStatResponse};

use crate::handlers::posts::require_can_mutate;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{target}/view
pub async fn record_view(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let snapshot = state.engagement.record_view(&path, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        engagement_response(&snapshot),
        "View recorded",
    )))
}

/// POST /api/posts/{target}/like
pub async fn record_like(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let snapshot = state.engagement.record_like(&path, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        engagement_response(&snapshot),
        "Like recorded",
    )))
}

/// DELETE /api/posts/{target}/like
pub async fn record_unlike(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let snapshot = state.engagement.record_unlike(&path, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        engagement_response(&snapshot),
        "Like removed",
    )))
}

/// GET /api/posts/{target}/stats - monthly rollup, owner or admin only.
pub async fn monthly_stats(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let principal = identity.principal();
    let post = state
        .lifecycle
        .get_for_read(Some(&principal), &path)
        .await?;
    require_can_mutate(&identity, &post)?;

    let stats = state.engagement.monthly_stats(&path).await?;

    let rows: Vec<MonthlyStatResponse> = stats
        .into_iter()
        .map(|s| MonthlyStatResponse {
            month: s.month,
            views: s.views,
            likes: s.likes,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(rows)))
}

fn engagement_response(snapshot: &EngagementSnapshot) -> EngagementResponse {
    EngagementResponse {
        post_id: snapshot.post_id.to_string(),
        slug: snapshot.slug.clone(),
        views: snapshot.views,
        likes: snapshot.likes,
    }
}
