//! Payment verification route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use fashion_hub_core::VerificationId;

use super::parse_path;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireSession;
use crate::models::PaymentVerification;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub order_code: String,
    pub transaction_id: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub accept: bool,
}

/// Claim that an order has been paid.
pub async fn submit(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
    Json(body): Json<SubmitRequest>,
) -> Result<ApiResponse<PaymentVerification>> {
    let verification = state
        .payments()
        .submit(
            &body.order_code,
            &body.transaction_id,
            body.method.as_deref(),
            caller.id,
        )
        .await?;
    Ok(ApiResponse::created(verification).with_message("Payment submitted for verification"))
}

/// Pending claims, oldest first.
pub async fn list_pending(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
) -> Result<ApiResponse<Vec<PaymentVerification>>> {
    Ok(ApiResponse::ok(
        state.payments().list_pending(caller.id).await?,
    ))
}

/// Accept or reject a claim.
pub async fn decide(
    State(state): State<AppState>,
    RequireSession(caller): RequireSession,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<ApiResponse<PaymentVerification>> {
    add_breadcrumb(
        "payments",
        "Payment decision",
        &[("verification_id", id.as_str())],
    );
    let id: VerificationId = parse_path(&id, "verification id")?;
    let verification = state
        .payments()
        .decide(id, caller.id, body.accept)
        .await?;
    Ok(ApiResponse::ok(verification))
}
