//! Password authentication for customers and admins.
//!
//! Both portals share the per-identifier rate limiter and session issuance.
//! A portal only admits the roles it serves, so a customer cannot sign in to
//! the admin portal and an admin cannot sign in as a customer.

use std::sync::Arc;

use fashion_hub_core::{Email, Identifier, PrincipalId, Role, sanitize_text};

use super::password::validate_password;
use super::{
    Admission, AttemptOutcome, LoginRateLimiter, PasswordHasher, ServiceError, ServiceResult,
    SessionManager, StoreDeadline, ValidationError,
};
use crate::clock::Clock;
use crate::db::{CredentialStore, RepositoryError};
use crate::models::{IssuedSession, Principal, SessionToken};

/// Which login surface an attempt came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    Storefront,
    Admin,
}

impl Portal {
    const fn admits(self, role: Role) -> bool {
        match self {
            Self::Storefront => matches!(role, Role::Customer),
            Self::Admin => role.is_admin(),
        }
    }
}

/// A successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    limiter: LoginRateLimiter,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    deadline: StoreDeadline,
    password_min_length: usize,
}

impl AuthService {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        limiter: LoginRateLimiter,
        sessions: SessionManager,
        clock: Arc<dyn Clock>,
        deadline: StoreDeadline,
        password_min_length: usize,
    ) -> Self {
        Self {
            credentials,
            hasher,
            limiter,
            sessions,
            clock,
            deadline,
            password_min_length,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a customer account. The email doubles as the login identifier.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed email, an empty name, or a short password
    /// - `DuplicateIdentifier` if the email is already registered
    pub async fn register_customer(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
    ) -> ServiceResult<Principal> {
        let email = Email::parse(email).map_err(ValidationError::from)?;
        let display_name = sanitize_text(display_name);
        if display_name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        validate_password(secret, self.password_min_length)?;

        let principal = Principal {
            id: PrincipalId::generate(),
            identifier: email.to_identifier(),
            display_name,
            contact_address: Some(email),
            password: self.hasher.hash(secret)?,
            role: Role::Customer,
            created_at: self.clock.now(),
            decided_by: None,
            decided_at: None,
        };
        insert_principal(self.credentials.as_ref(), self.deadline, &principal).await?;

        tracing::info!(principal_id = %principal.id, "customer registered");
        Ok(principal)
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Password login through `portal`.
    ///
    /// Unknown identifiers, wrong passwords, and roles the portal does not
    /// serve all fail the same way and all count against the limiter.
    ///
    /// # Errors
    ///
    /// - `RateLimited` while the identifier is throttled
    /// - `InvalidCredential` on any credential mismatch
    /// - `PendingApproval` / `AccessRejected` for admins not yet approved
    pub async fn login(
        &self,
        portal: Portal,
        identifier: &str,
        secret: &str,
    ) -> ServiceResult<LoginOutcome> {
        let identifier = Identifier::parse(identifier).map_err(ValidationError::from)?;
        if self.limiter.is_blocked(&identifier).await {
            return Err(ServiceError::RateLimited);
        }

        let found = self
            .deadline
            .run(
                "principals.find_by_identifier",
                self.credentials.find_by_identifier(&identifier),
            )
            .await?;

        // Hash on every path so timing does not reveal registered identifiers.
        let verified = match &found {
            Some(p) => self.hasher.verify(secret, &p.password),
            None => self.hasher.verify_absent(secret),
        };
        let principal = match found {
            Some(p) if verified && portal.admits(p.role) => p,
            _ => {
                return match self
                    .limiter
                    .check_and_record(&identifier, AttemptOutcome::Failure)
                    .await
                {
                    Admission::Blocked => Err(ServiceError::RateLimited),
                    Admission::Allowed => {
                        tracing::info!(identifier = %identifier, ?portal, "login failed");
                        Err(ServiceError::InvalidCredential)
                    }
                };
            }
        };

        if self
            .limiter
            .check_and_record(&identifier, AttemptOutcome::Success)
            .await
            == Admission::Blocked
        {
            return Err(ServiceError::RateLimited);
        }

        self.finish_login(principal).await
    }

    /// Apply the approval gate and issue a session.
    async fn finish_login(&self, principal: Principal) -> ServiceResult<LoginOutcome> {
        match principal.role {
            Role::PendingAdmin => return Err(ServiceError::PendingApproval),
            Role::RejectedAdmin => return Err(ServiceError::AccessRejected),
            Role::Customer | Role::ApprovedAdmin | Role::MainAdmin => {}
        }

        let session = self.sessions.issue(principal.id).await?;
        tracing::info!(principal_id = %principal.id, role = %principal.role, "login succeeded");
        Ok(LoginOutcome { principal, session })
    }

    /// Revoke a session. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable` on storage faults.
    pub async fn logout(&self, token: &SessionToken) -> ServiceResult<bool> {
        self.sessions.revoke(token).await
    }
}

/// Store a new principal, mapping a taken identifier to `DuplicateIdentifier`.
pub(crate) async fn insert_principal(
    credentials: &dyn CredentialStore,
    deadline: StoreDeadline,
    principal: &Principal,
) -> ServiceResult<()> {
    match deadline
        .run("principals.insert", credentials.insert(principal))
        .await
    {
        Ok(()) => Ok(()),
        Err(RepositoryError::Conflict(_)) => Err(ServiceError::DuplicateIdentifier),
        Err(e) => Err(e.into()),
    }
}
