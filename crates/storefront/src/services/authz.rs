//! Caller resolution and role checks.
//!
//! Every check reads the principal fresh from the credential store. A
//! session proves identity only; a role that changed after login is honored
//! immediately.

use std::sync::Arc;

use fashion_hub_core::PrincipalId;

use super::{ServiceError, ServiceResult, SessionManager, StoreDeadline};
use crate::db::CredentialStore;
use crate::models::{Principal, SessionLookup, SessionToken};

#[derive(Clone)]
pub struct Authorizer {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionManager,
    deadline: StoreDeadline,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: SessionManager,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            credentials,
            sessions,
            deadline,
        }
    }

    /// Resolve a bearer token to its principal.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the session has lapsed
    /// - `Unauthenticated` if the token is unknown or its principal is gone
    pub async fn authenticate(&self, token: &SessionToken) -> ServiceResult<Principal> {
        match self.sessions.validate(token).await? {
            SessionLookup::Active(session) => self.load(session.principal_id).await,
            SessionLookup::Expired => Err(ServiceError::SessionExpired),
            SessionLookup::NotFound => Err(ServiceError::Unauthenticated),
        }
    }

    /// Read the caller's current record.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the principal no longer exists.
    pub async fn load(&self, caller: PrincipalId) -> ServiceResult<Principal> {
        self.deadline
            .run("principals.find_by_id", self.credentials.find_by_id(caller))
            .await?
            .ok_or(ServiceError::Unauthenticated)
    }

    /// The caller, if they are the main admin.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for anyone else.
    pub async fn require_main(&self, caller: PrincipalId) -> ServiceResult<Principal> {
        let principal = self.load(caller).await?;
        if principal.role.is_main() {
            Ok(principal)
        } else {
            tracing::warn!(principal_id = %caller, role = %principal.role, "main admin required");
            Err(ServiceError::PermissionDenied)
        }
    }

    /// The caller, if their admin access is approved.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for customers and pending or rejected admins.
    pub async fn require_approved_admin(&self, caller: PrincipalId) -> ServiceResult<Principal> {
        let principal = self.load(caller).await?;
        if principal.role.is_approved_admin() {
            Ok(principal)
        } else {
            tracing::warn!(principal_id = %caller, role = %principal.role, "approved admin required");
            Err(ServiceError::PermissionDenied)
        }
    }
}
