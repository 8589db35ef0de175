//! Admin portal route handlers.
//!
//! Access requests and admin login are open (behind the IP throttle).
//! Everything else needs a bearer session, and the services re-check the
//! caller's current role on every call.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use fashion_hub_core::{Decision, OrderStatus, PrincipalId};

use super::auth::{LoginRequest, SessionResponse};
use super::parse_path;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireSession;
use crate::models::{Order, PrincipalView};
use crate::response::ApiResponse;
use crate::services::Portal;
use crate::state::AppState;

/// Interval between SSE keep-alive comments.
const FEED_KEEP_ALIVE: Duration = Duration::from_secs(15);

// =============================================================================
// Request Types
// =============================================================================

/// Admin access request body.
#[derive(Deserialize)]
pub struct AccessRequest {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub location: Option<String>,
}

// =============================================================================
// Access requests and login
// =============================================================================

/// File an admin access request.
pub async fn request_access(
    State(state): State<AppState>,
    Json(body): Json<AccessRequest>,
) -> Result<ApiResponse<PrincipalView>> {
    let principal = state
        .admin()
        .request_access(&body.identifier, body.name.as_deref(), &body.password)
        .await?;
    Ok(ApiResponse::created(PrincipalView::from(principal))
        .with_message("Request submitted and awaiting approval"))
}

/// Admin password login.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<SessionResponse>> {
    let outcome = state
        .auth()
        .login(Portal::Admin, &body.identifier, &body.password)
        .await?;
    Ok(ApiResponse::ok(SessionResponse::from(outcome)))
}

// =============================================================================
// Main admin
// =============================================================================

/// Pending access requests, oldest first.
pub async fn list_pending(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<ApiResponse<Vec<PrincipalView>>> {
    let pending = state.admin().list_pending(caller.id).await?;
    Ok(ApiResponse::ok(
        pending.into_iter().map(PrincipalView::from).collect(),
    ))
}

/// Every admin in any state.
pub async fn list_admins(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<ApiResponse<Vec<PrincipalView>>> {
    let admins = state.admin().list_admins(caller.id).await?;
    Ok(ApiResponse::ok(
        admins.into_iter().map(PrincipalView::from).collect(),
    ))
}

/// Approve, reject, or revoke an admin.
pub async fn decide(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<ApiResponse<PrincipalView>> {
    let target: PrincipalId = parse_path(&id, "admin id")?;
    let principal = state
        .admin()
        .decide(caller.id, target, body.decision)
        .await?;
    let role = principal.role.to_string();
    add_breadcrumb(
        "admin",
        "Admin decision",
        &[("target", id.as_str()), ("role", role.as_str())],
    );
    Ok(ApiResponse::ok(PrincipalView::from(principal)))
}

// =============================================================================
// Orders
// =============================================================================

/// All orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<ApiResponse<Vec<Order>>> {
    Ok(ApiResponse::ok(state.orders().list_all(caller.id).await?))
}

/// Move an order to a new fulfillment status.
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
    Path(code): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<ApiResponse<Order>> {
    let order = state
        .orders()
        .update_status(&code, body.status, body.location.as_deref(), caller.id)
        .await?;
    Ok(ApiResponse::ok(order))
}

/// Live order snapshots as server-sent events.
///
/// Each event is named after what happened (`created`, `status_changed`,
/// `paid`) and carries the full order. Closing the connection cancels the
/// subscription.
pub async fn order_events(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    state.authz().require_approved_admin(caller.id).await?;
    let subscription = state.feed().subscribe();
    tracing::info!(principal_id = %caller.id, "order feed subscribed");

    let events = subscription.into_stream().filter_map(|event| async move {
        match Event::default().event(event.kind.as_str()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!(error = %e, "order event could not be serialized");
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(FEED_KEEP_ALIVE)))
}
