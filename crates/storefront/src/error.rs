//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every [`ServiceError`] maps
//! to a fixed status code and its stable `code` string, so clients can branch
//! on the failure without parsing messages. Server-side failures are
//! captured to Sentry before responding; their detail never reaches the
//! client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiFailure;
use crate::services::ServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A service refused or failed the operation.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Malformed request outside what the services validate (path ids, headers).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// The HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::DuplicateIdentifier
                | ServiceError::AlreadyDecided
                | ServiceError::InvalidTransition { .. }
                | ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::InvalidCredential
                | ServiceError::SessionExpired
                | ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::PendingApproval
                | ServiceError::AccessRejected
                | ServiceError::PermissionDenied
                | ServiceError::ProtectedPrincipal => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::InvalidTarget => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ServiceError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code for the response body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Service(err) => err.code(),
            Self::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Service(ServiceError::PartialFailure { .. })) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Service(ServiceError::PartialFailure { .. }) => {
                "Payment was verified but the order could not be updated; an operator has been notified"
                    .to_owned()
            }
            _ => self.to_string(),
        };

        let body = ApiFailure::new(self.code(), message);
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a principal ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(principal_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(principal_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for an admin or payment action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_owned(),
            serde_json::Value::String((*value).to_owned()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
