//! Order route handlers.
//!
//! Checkout and tracking are open to guests. A guest tracks an order by its
//! code alone.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::Result;
use crate::middleware::{OptionalSession, RequireSession};
use crate::models::{NewOrder, Order};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Place an order.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(caller): OptionalSession,
    Json(payload): Json<NewOrder>,
) -> Result<ApiResponse<Order>> {
    let order = state
        .orders()
        .create(payload, caller.map(|p| p.id))
        .await?;
    Ok(ApiResponse::created(order).with_message("Order placed"))
}

/// The caller's own orders, newest first.
pub async fn mine(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<ApiResponse<Vec<Order>>> {
    Ok(ApiResponse::ok(state.orders().list_mine(caller.id).await?))
}

/// Track an order by code.
pub async fn track(
    State(state): State<AppState>,
    OptionalSession(caller): OptionalSession,
    Path(code): Path<String>,
) -> Result<ApiResponse<Order>> {
    let order = state.orders().track(&code, caller.map(|p| p.id)).await?;
    Ok(ApiResponse::ok(order))
}
