//! Account handlers: registration, login, email verification, password reset.

use actix_web::{HttpResponse, web};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;

use quill_core::domain::{DomainEvent, User};
use quill_core::ports::{PasswordService, TokenService};
use quill_shared::dto::{
    AuthResponse, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest,
    UserResponse, VerifyEmailRequest,
};
use quill_shared::ApiResponse;

use crate::handlers::emit_event;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Validate input
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // Check if user already exists
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    // Hash password
    let password_hash = password_service
        .hash(&req.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Create user with a pending verification token
    let mut user = User::new(req.email.clone(), req.username, Some(password_hash));
    let verification_token = uuid::Uuid::new_v4().to_string();
    user.reset_token = Some(verification_token.clone());
    user.reset_token_expires_at = Some(Utc::now() + TimeDelta::hours(24));

    let saved_user = state.users.insert(user).await?;
    tracing::info!(user_id = %saved_user.id, "Account registered");

    emit_event(
        &state,
        &DomainEvent::AccountRegistered {
            user_id: saved_user.id,
            email: saved_user.email.clone(),
            verification_token,
        },
    )
    .await;

    // Generate token
    let token = token_service
        .generate_token(saved_user.id, &saved_user.email, saved_user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds() as u64,
    }))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Find user by email
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // Social-auth accounts carry no password hash and cannot password-login
    let hash = user.password_hash.as_deref().ok_or(AppError::Unauthorized)?;

    let valid = password_service
        .verify(&req.password, hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    // Generate token
    let token = token_service
        .generate_token(user.id, &user.email, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds() as u64,
    }))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(user_response(&user)))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    state: web::Data<AppState>,
    body: web::Json<VerifyEmailRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut user = state
        .users
        .find_by_reset_token(&req.token)
        .await?
        .filter(|u| u.token_valid(&req.token, Utc::now()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

    user.email_verified = true;
    user.reset_token = None;
    user.reset_token_expires_at = None;
    user.updated_at = Utc::now();
    state.users.update(user).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message_only("Email verified")))
}

/// POST /api/auth/password-reset/request
///
/// Always reports success so the endpoint cannot be used to probe for
/// registered addresses.
pub async fn request_password_reset(
    state: web::Data<AppState>,
    body: web::Json<PasswordResetRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if let Some(mut user) = state.users.find_by_email(&req.email).await? {
        let reset_token = uuid::Uuid::new_v4().to_string();
        user.reset_token = Some(reset_token.clone());
        user.reset_token_expires_at = Some(Utc::now() + TimeDelta::hours(1));
        user.updated_at = Utc::now();

        let user = state.users.update(user).await?;
        tracing::info!(user_id = %user.id, "Password reset requested");

        emit_event(
            &state,
            &DomainEvent::PasswordResetRequested {
                user_id: user.id,
                email: user.email,
                reset_token,
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(ApiResponse::message_only(
        "If that address is registered, a reset email is on its way",
    )))
}

/// POST /api/auth/password-reset/confirm
pub async fn confirm_password_reset(
    state: web::Data<AppState>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<PasswordResetConfirm>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let mut user = state
        .users
        .find_by_reset_token(&req.token)
        .await?
        .filter(|u| u.token_valid(&req.token, Utc::now()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

    let password_hash = password_service
        .hash(&req.new_password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    user.password_hash = Some(password_hash);
    user.reset_token = None;
    user.reset_token_expires_at = None;
    // Completing the flow proves control of the mailbox
    user.email_verified = true;
    user.updated_at = Utc::now();

    let user = state.users.update(user).await?;
    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(HttpResponse::Ok().json(ApiResponse::message_only("Password updated")))
}

fn user_response(user: &quill_core::domain::User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
        email_verified: user.email_verified,
        created_at: user.created_at.to_rfc3339(),
    }
}
