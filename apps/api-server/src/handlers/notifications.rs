//! Web Push subscription handlers. Delivery itself happens outside this
//! system; these endpoints only manage the stored subscriptions the
//! dispatcher fans out to.

use actix_web::{HttpResponse, web};

use quill_core::domain::PushSubscription;
use quill_shared::ApiResponse;
use quill_shared::dto::{PushSubscriptionRequest, PushUnsubscribeRequest};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/notifications/subscriptions
pub async fn register_subscription(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    body: web::Json<PushSubscriptionRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.endpoint.is_empty() || req.p256dh.is_empty() || req.auth.is_empty() {
        return Err(AppError::BadRequest(
            "endpoint, p256dh and auth are required".to_string(),
        ));
    }

    if state
        .push_subscriptions
        .find_by_endpoint(&req.endpoint)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Endpoint already registered".to_string()));
    }

    let user_id = identity.0.map(|i| i.user_id);
    let sub = state
        .push_subscriptions
        .insert(PushSubscription::new(
            req.endpoint,
            req.p256dh,
            req.auth,
            user_id,
        ))
        .await?;

    tracing::info!(subscription_id = %sub.id, "Push subscription registered");

    Ok(HttpResponse::Created().json(ApiResponse::message_only("Push subscription registered")))
}

/// DELETE /api/notifications/subscriptions
pub async fn remove_subscription(
    state: web::Data<AppState>,
    body: web::Json<PushUnsubscribeRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    state
        .push_subscriptions
        .delete_by_endpoint(&req.endpoint)
        .await?;

    tracing::info!("Push subscription removed");

    Ok(HttpResponse::Ok().json(ApiResponse::message_only("Push subscription removed")))
}
