//! Bearer session extractors.
//!
//! Clients send `Authorization: Bearer <token>`. The token is resolved on
//! every request and the principal re-read, so a revoked or demoted admin
//! loses access on their next call.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::models::{Principal, SessionToken};
use crate::services::ServiceError;
use crate::state::AppState;

/// Read the bearer token from the `Authorization` header, if any.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty())
        .then(|| SessionToken::from_client(token))
}

/// Extractor that requires a valid session.
///
/// Rejects with `401` and `unauthenticated` when no token is sent, and with
/// `session_expired` when the session has lapsed.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(
///     State(state): State<AppState>,
///     RequireSession(principal): RequireSession,
/// ) -> Result<ApiResponse<Vec<Order>>> {
///     Ok(ApiResponse::ok(state.orders().list_mine(principal.id).await?))
/// }
/// ```
pub struct RequireSession(pub Principal);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ServiceError::Unauthenticated)?;
        let principal = state.authz().authenticate(&token).await?;
        tracing::Span::current().record("principal_id", tracing::field::display(principal.id));
        Ok(Self(principal))
    }
}

/// Extractor for routes open to guests.
///
/// A missing header yields `None`. A token that is present but invalid is
/// still rejected, so a client with a stale session learns about it instead
/// of silently acting as a guest.
pub struct OptionalSession(pub Option<Principal>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(Self(Some(state.authz().authenticate(&token).await?))),
            None => Ok(Self(None)),
        }
    }
}
