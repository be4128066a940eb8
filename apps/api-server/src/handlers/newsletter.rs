//! Newsletter subscription handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::{DomainEvent, Subscriber};
use quill_shared::ApiResponse;
use quill_shared::dto::NewsletterRequest;

use crate::handlers::emit_event;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/newsletter/subscribe
pub async fn subscribe(
    state: web::Data<AppState>,
    body: web::Json<NewsletterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if state.subscribers.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Already subscribed".to_string()));
    }

    let subscriber = state.subscribers.insert(Subscriber::new(req.email)).await?;
    tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription added");

    emit_event(
        &state,
        &DomainEvent::SubscriberJoined {
            email: subscriber.email,
        },
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::message_only("Subscribed to the newsletter")))
}

/// POST /api/newsletter/unsubscribe
pub async fn unsubscribe(
    state: web::Data<AppState>,
    body: web::Json<NewsletterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    state.subscribers.delete_by_email(&req.email).await?;
    tracing::info!("Newsletter subscription removed");

    Ok(HttpResponse::Ok().json(ApiResponse::message_only("Unsubscribed from the newsletter")))
}
