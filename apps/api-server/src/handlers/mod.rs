//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod engagement;
mod health;
mod newsletter;
mod notifications;
mod posts;

use std::sync::Arc;

use actix_web::web;

use quill_core::domain::DomainEvent;
use quill_core::ports::RateLimiter;

use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Configure all application routes. The engagement endpoints sit behind
/// the per-client rate limiter.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Arc<dyn RateLimiter>) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me))
                    .route("/verify-email", web::post().to(auth::verify_email))
                    .route(
                        "/password-reset/request",
                        web::post().to(auth::request_password_reset),
                    )
                    .route(
                        "/password-reset/confirm",
                        web::post().to(auth::confirm_password_reset),
                    ),
            )
            // Post lifecycle and engagement
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list_public))
                    .route("", web::post().to(posts::create))
                    .service(
                        web::resource("/{target}/view")
                            .wrap(RateLimitMiddleware::new(limiter.clone()))
                            .route(web::post().to(engagement::record_view)),
                    )
                    .service(
                        web::resource("/{target}/like")
                            .wrap(RateLimitMiddleware::new(limiter))
                            .route(web::post().to(engagement::record_like))
                            .route(web::delete().to(engagement::record_unlike)),
                    )
                    .route("/{target}/stats", web::get().to(engagement::monthly_stats))
                    .route("/{target}/status", web::post().to(posts::transition))
                    .route("/{target}/publish", web::post().to(posts::publish))
                    .route("/{target}", web::get().to(posts::get))
                    .route("/{target}", web::put().to(posts::update))
                    .route("/{target}", web::delete().to(posts::delete)),
            )
            .route("/authors/{id}/posts", web::get().to(posts::list_by_author))
            // Moderation surface
            .service(
                web::scope("/admin")
                    .route("/posts", web::get().to(admin::list_posts))
                    .route("/posts/{target}/approve", web::post().to(admin::approve))
                    .route("/posts/{target}/reject", web::post().to(admin::reject)),
            )
            // Newsletter & push subscriptions
            .service(
                web::scope("/newsletter")
                    .route("/subscribe", web::post().to(newsletter::subscribe))
                    .route("/unsubscribe", web::post().to(newsletter::unsubscribe)),
            )
            .service(
                web::scope("/notifications")
                    .route(
                        "/subscriptions",
                        web::post().to(notifications::register_subscription),
                    )
                    .route(
                        "/subscriptions",
                        web::delete().to(notifications::remove_subscription),
                    ),
            ),
    );
}

/// Publish a domain event from a handler, fire-and-forget.
pub(crate) async fn emit_event(state: &AppState, event: &DomainEvent) {
    let payload = match serde_json::to_string(event) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize domain event");
            return;
        }
    };

    if let Err(e) = state.events.publish(event.channel(), &payload).await {
        tracing::warn!(channel = %event.channel(), error = %e, "Event publish failed");
    }
}
