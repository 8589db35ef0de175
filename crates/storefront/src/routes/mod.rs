//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                                           - Liveness
//! GET   /health/ready                                     - Readiness (database)
//!
//! # Customer auth (IP throttled)
//! POST  /api/auth/register                                - Register customer
//! POST  /api/auth/login                                   - Password login
//! POST  /api/auth/logout                                  - Revoke session
//! POST  /api/auth/otp/request                             - Send one-time code
//! POST  /api/auth/otp/verify                              - One-time code login
//!
//! # Admin access (IP throttled)
//! POST  /api/admin/requests                               - Request admin access
//! POST  /api/admin/login                                  - Admin login
//!
//! # Main admin
//! GET   /api/admin/requests/pending                       - Pending requests
//! GET   /api/admin/admins                                 - All admins
//! POST  /api/admin/admins/{id}/decision                   - Approve / reject
//!
//! # Orders
//! POST  /api/orders                                       - Place order (guest ok)
//! GET   /api/orders/mine                                  - Caller's orders
//! GET   /api/orders/{code}                                - Track order (guest ok)
//! GET   /api/admin/orders                                 - All orders
//! PATCH /api/admin/orders/{code}/status                   - Update status
//! GET   /api/admin/orders/events                          - Order feed (SSE)
//!
//! # Payments
//! POST  /api/payments/verifications                       - Submit payment claim
//! GET   /api/admin/payments/verifications/pending         - Pending claims
//! POST  /api/admin/payments/verifications/{id}/decision   - Accept / reject
//! ```

pub mod admin;
pub mod auth;
pub mod orders;
pub mod payments;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the throttled authentication routes.
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let security = &state.config().security;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/otp/request", post(auth::request_code))
        .route("/api/auth/otp/verify", post(auth::verify_code))
        .route("/api/admin/requests", post(admin::request_access))
        .route("/api/admin/login", post(admin::login))
        .layer(auth_rate_limiter(
            security.auth_throttle_burst,
            security.auth_throttle_replenish,
        ))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/requests/pending", get(admin::list_pending))
        .route("/admins", get(admin::list_admins))
        .route("/admins/{id}/decision", post(admin::decide))
        .route("/orders", get(admin::list_orders))
        .route("/orders/events", get(admin::order_events))
        .route("/orders/{code}/status", patch(admin::update_order_status))
        .route(
            "/payments/verifications/pending",
            get(payments::list_pending),
        )
        .route(
            "/payments/verifications/{id}/decision",
            post(payments::decide),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/mine", get(orders::mine))
        .route("/{code}", get(orders::track))
}

/// Create all routes for the storefront.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/auth/logout", post(auth::logout))
        .merge(auth_routes(state))
        .nest("/api/admin", admin_routes())
        .nest("/api/orders", order_routes())
        .route("/api/payments/verifications", post(payments::submit))
}

/// Build the complete application with its middleware stack.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// the auth throttle can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes(&state))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                    principal_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Parse a path segment, reporting failures in the response envelope.
pub(crate) fn parse_path<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {what}")))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK. The in-memory
/// backend is always ready.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.stores().pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::CONTENT_TYPE;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::db::Stores;

    fn test_app() -> Router {
        app(AppState::new(StorefrontConfig::with_defaults(), Stores::in_memory()))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_sets_security_headers() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let response = test_app()
            .oneshot(Request::get("/api/orders/mine").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_register_through_throttled_group() {
        let request = Request::post("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .header("x-real-ip", "198.51.100.4")
            .body(Body::from(
                r#"{"name":"Meera","email":"meera@example.com","password":"saree-season-1"}"#,
            ))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["data"]["role"], "customer");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_malformed_order_code_is_a_validation_error() {
        let response = test_app()
            .oneshot(Request::get("/api/orders/not-a-code").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "validation_error");
    }

    #[test]
    fn test_parse_path_reports_what_failed() {
        assert_eq!(parse_path::<u32>("42", "count").unwrap(), 42);
        let err = parse_path::<fashion_hub_core::PrincipalId>("nope", "admin id").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "invalid admin id"));
    }
}
