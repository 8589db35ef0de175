//! Service error taxonomy.
//!
//! Callers branch on these variants, so authorization and state-machine
//! failures are never collapsed into a generic error. Storage faults are the
//! exception: they are logged with detail here and surfaced only as
//! [`ServiceError::UpstreamUnavailable`].

use thiserror::Error;

use fashion_hub_core::{
    EmailError, IdentifierError, OrderCodeError, OrderStatus, PriceError, VerificationId,
};

use crate::db::RepositoryError;

/// Malformed or missing input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("branch is required")]
    MissingBranch,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("quantity for {sku} must be between 1 and {max}")]
    InvalidQuantity { sku: String, max: u32 },
    #[error("price for {sku} is invalid: {source}")]
    InvalidPrice { sku: String, source: PriceError },
    #[error("order has more than {max} lines")]
    TooManyItems { max: usize },
    #[error("invalid identifier: {0}")]
    Identifier(#[from] IdentifierError),
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
    #[error("invalid order code: {0}")]
    OrderCode(#[from] OrderCodeError),
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("order is already paid")]
    AlreadyPaid,
}

/// Errors returned by every storefront service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("identifier is already registered")]
    DuplicateIdentifier,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("admin access is awaiting approval")]
    PendingApproval,

    #[error("admin access was rejected")]
    AccessRejected,

    #[error("permission denied")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("already decided")]
    AlreadyDecided,

    #[error("the main admin cannot be changed")]
    ProtectedPrincipal,

    #[error("target is not an admin")]
    InvalidTarget,

    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("session expired")]
    SessionExpired,

    #[error("authentication required")]
    Unauthenticated,

    #[error("service temporarily unavailable")]
    UpstreamUnavailable,

    /// The verification was recorded but its order could not be updated.
    /// Needs operator reconciliation, not a retry.
    #[error("verification {verification_id} recorded but order {order_code} was not updated")]
    PartialFailure {
        verification_id: VerificationId,
        order_code: String,
    },
}

impl ServiceError {
    /// Stable machine-readable code for API clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::InvalidCredential => "invalid_credential",
            Self::PendingApproval => "pending_approval",
            Self::AccessRejected => "access_rejected",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::AlreadyDecided => "already_decided",
            Self::ProtectedPrincipal => "protected_principal",
            Self::InvalidTarget => "invalid_target",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::SessionExpired => "session_expired",
            Self::Unauthenticated => "unauthenticated",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::PartialFailure { .. } => "partial_failure",
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!(error = %err, "store call failed");
        Self::UpstreamUnavailable
    }
}

/// Shorthand used by the service modules.
pub type ServiceResult<T> = Result<T, ServiceError>;
