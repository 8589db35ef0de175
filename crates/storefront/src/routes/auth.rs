//! Customer authentication route handlers.
//!
//! Registration, password login, logout, and one-time code login for the
//! storefront portal. Admin login lives in [`super::admin`].

use axum::{Json, extract::State, http::HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::bearer_token;
use crate::models::PrincipalView;
use crate::response::ApiResponse;
use crate::services::{LoginOutcome, Portal, ServiceError};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Customer registration body.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Password login body. Shared by both portals.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub identifier: String,
}

#[derive(Deserialize)]
pub struct CodeVerifyRequest {
    pub identifier: String,
    pub code: String,
}

/// A freshly issued session. The token is only ever shown here.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal: PrincipalView,
}

impl From<LoginOutcome> for SessionResponse {
    fn from(outcome: LoginOutcome) -> Self {
        set_sentry_user(&outcome.principal.id);
        Self {
            token: outcome.session.token.as_str().to_owned(),
            expires_at: outcome.session.session.expires_at,
            principal: PrincipalView::from(outcome.principal),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a customer account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiResponse<PrincipalView>> {
    let principal = state
        .auth()
        .register_customer(&body.name, &body.email, &body.password)
        .await?;
    Ok(ApiResponse::created(PrincipalView::from(principal)).with_message("Account created"))
}

/// Customer password login.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<SessionResponse>> {
    let outcome = state
        .auth()
        .login(Portal::Storefront, &body.identifier, &body.password)
        .await?;
    Ok(ApiResponse::ok(SessionResponse::from(outcome)))
}

/// Revoke the presented session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<ApiResponse<()>> {
    let token = bearer_token(&headers).ok_or(ServiceError::Unauthenticated)?;
    state.auth().logout(&token).await?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}

/// Send a one-time login code.
///
/// Always answers the same way for registered and unknown identifiers.
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<CodeRequest>,
) -> Result<ApiResponse<()>> {
    state.otp().request_code(&body.identifier).await?;
    Ok(ApiResponse::message(
        "If the account exists, a code has been sent",
    ))
}

/// Exchange a one-time code for a session.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<CodeVerifyRequest>,
) -> Result<ApiResponse<SessionResponse>> {
    let outcome = state
        .otp()
        .verify_code(&body.identifier, &body.code)
        .await?;
    Ok(ApiResponse::ok(SessionResponse::from(outcome)))
}
