//! Business logic for storefront.
//!
//! # Services
//!
//! - [`auth`] - customer registration, password login for both portals, logout
//! - [`admin_approval`] - admin access requests and the main admin's decisions
//! - [`orders`] - checkout, tracking, and fulfillment status
//! - [`payments`] - payment claims and their verification
//! - [`otp`] - one-time passcode login
//! - [`authz`] - resolves callers and checks their current role
//! - [`sessions`] - bearer session issuance and expiry
//! - [`rate_limit`] - per-identifier failed-login throttling
//! - [`feed`] - order change subscriptions
//!
//! Services take the caller's principal id, not a cached role, and re-read
//! the role from the credential store before every mutation.

pub mod admin_approval;
pub mod auth;
pub mod authz;
pub mod error;
pub mod feed;
pub mod orders;
pub mod otp;
pub mod password;
pub mod payments;
pub mod rate_limit;
pub mod sessions;

use std::future::Future;
use std::time::Duration;

pub use admin_approval::{AdminApprovalService, BootstrapOutcome};
pub use auth::{AuthService, LoginOutcome, Portal};
pub use authz::Authorizer;
pub use error::{ServiceError, ServiceResult, ValidationError};
pub use feed::{OrderFeed, OrderSubscription};
pub use orders::OrderService;
pub use otp::{CodeSendError, CodeSender, LogCodeSender, OtpService};
pub use password::PasswordHasher;
pub use payments::PaymentService;
pub use rate_limit::{Admission, AttemptOutcome, LoginRateLimiter};
pub use sessions::SessionManager;

use crate::db::RepositoryError;

/// Upper bound on how long any single store call may take.
#[derive(Debug, Clone, Copy)]
pub struct StoreDeadline(Duration);

impl StoreDeadline {
    #[must_use]
    pub const fn new(limit: Duration) -> Self {
        Self(limit)
    }

    /// Await `call`, failing with `RepositoryError::Timeout(op)` past the deadline.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `Timeout` if it did not finish in time.
    pub async fn run<T, F>(self, op: &'static str, call: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        if let Ok(result) = tokio::time::timeout(self.0, call).await {
            result
        } else {
            tracing::warn!(op, timeout_ms = self.0.as_millis(), "store call timed out");
            Err(RepositoryError::Timeout(op))
        }
    }
}
