//! # Quill API Server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;

use quill_core::ports::RateLimiter;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    // Build application state
    let state = AppState::new(&config).await;

    // Wire the notification dispatcher to the event channels
    background::dispatcher::start(&state).await;

    #[cfg(feature = "auth")]
    let token_service: Arc<dyn quill_core::ports::TokenService> =
        Arc::new(quill_infra::auth::JwtTokenService::from_env());
    #[cfg(feature = "auth")]
    let password_service: Arc<dyn quill_core::ports::PasswordService> =
        Arc::new(quill_infra::auth::Argon2PasswordService::new());

    #[cfg(feature = "rate-limit")]
    let limiter: Arc<dyn RateLimiter> =
        Arc::new(quill_infra::rate_limit::KeyedRateLimiter::from_env());
    #[cfg(not(feature = "rate-limit"))]
    let limiter: Arc<dyn RateLimiter> = Arc::new(middleware::rate_limit::AllowAllLimiter);

    // Start HTTP server
    HttpServer::new(move || {
        let app = App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()));

        #[cfg(feature = "auth")]
        let app = app
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(password_service.clone()));

        let limiter = limiter.clone();
        app.configure(move |cfg| handlers::configure_routes(cfg, limiter))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,api_server=debug,quill_infra=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}
