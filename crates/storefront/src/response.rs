//! The JSON envelope every API response uses.
//!
//! ```json
//! { "success": true,  "message": "...", "data": { ... } }
//! { "success": false, "code": "pending_approval", "message": "..." }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A successful API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    /// `201 Created` carrying `data`.
    #[must_use]
    pub const fn created(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            status: StatusCode::CREATED,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// `200 OK` with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A failed API response body.
#[derive(Debug, Serialize)]
pub struct ApiFailure {
    success: bool,
    code: &'static str,
    message: String,
}

impl ApiFailure {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
        }
    }
}
