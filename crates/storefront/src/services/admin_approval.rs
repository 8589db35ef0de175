//! Admin access requests and the main admin's decisions.
//!
//! ```text
//! pending ──approve──▶ approved ──revoke──▶ rejected
//!    └─────reject────────────────────────────▲
//! ```
//!
//! Rejected is final. The main admin is created by bootstrap and can never
//! be the target of a decision.

use std::sync::Arc;

use fashion_hub_core::{Decision, Email, Identifier, PrincipalId, Role, sanitize_text};

use super::auth::insert_principal;
use super::password::validate_password;
use super::{
    Authorizer, PasswordHasher, ServiceError, ServiceResult, StoreDeadline, ValidationError,
};
use crate::clock::Clock;
use crate::db::{CredentialStore, RepositoryError};
use crate::models::Principal;

/// Every role an admin account can hold.
pub const ADMIN_ROLES: [Role; 4] = [
    Role::PendingAdmin,
    Role::ApprovedAdmin,
    Role::RejectedAdmin,
    Role::MainAdmin,
];

/// What bootstrapping the main admin did.
#[derive(Debug)]
pub enum BootstrapOutcome {
    Created(Principal),
    /// An existing principal with matching credentials was promoted.
    Promoted(Principal),
    AlreadyPresent(Principal),
}

impl BootstrapOutcome {
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        match self {
            Self::Created(p) | Self::Promoted(p) | Self::AlreadyPresent(p) => p,
        }
    }
}

#[derive(Clone)]
pub struct AdminApprovalService {
    credentials: Arc<dyn CredentialStore>,
    authz: Authorizer,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    deadline: StoreDeadline,
    password_min_length: usize,
}

impl AdminApprovalService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        authz: Authorizer,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
        deadline: StoreDeadline,
        password_min_length: usize,
    ) -> Self {
        Self {
            credentials,
            authz,
            hasher,
            clock,
            deadline,
            password_min_length,
        }
    }

    /// File an admin access request. The new principal starts pending.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed identifier or short password
    /// - `DuplicateIdentifier` if any principal already uses the identifier,
    ///   including a rejected admin
    pub async fn request_access(
        &self,
        identifier: &str,
        display_name: Option<&str>,
        secret: &str,
    ) -> ServiceResult<Principal> {
        let principal = self.new_principal(identifier, display_name, secret, Role::PendingAdmin)?;
        insert_principal(self.credentials.as_ref(), self.deadline, &principal).await?;

        tracing::info!(principal_id = %principal.id, identifier = %principal.identifier, "admin access requested");
        Ok(principal)
    }

    /// Pending requests, oldest first. Main admin only.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller is the main admin.
    pub async fn list_pending(&self, caller: PrincipalId) -> ServiceResult<Vec<Principal>> {
        self.authz.require_main(caller).await?;
        Ok(self
            .deadline
            .run(
                "principals.list_by_roles",
                self.credentials.list_by_roles(&[Role::PendingAdmin]),
            )
            .await?)
    }

    /// Every admin principal in any state. Main admin only.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller is the main admin.
    pub async fn list_admins(&self, caller: PrincipalId) -> ServiceResult<Vec<Principal>> {
        self.authz.require_main(caller).await?;
        Ok(self
            .deadline
            .run(
                "principals.list_by_roles",
                self.credentials.list_by_roles(&ADMIN_ROLES),
            )
            .await?)
    }

    /// Approve, reject, or revoke an admin.
    ///
    /// Re-applying the target's current decision is a no-op success.
    /// Revoking an approved admin is allowed; reopening a rejected one is not.
    ///
    /// # Errors
    ///
    /// - `ProtectedPrincipal` if the target is the main admin, whoever asks
    /// - `PermissionDenied` unless the caller is the main admin
    /// - `InvalidTarget` if the target is absent or not an admin
    /// - `AlreadyDecided` if the move is not allowed or lost a race
    pub async fn decide(
        &self,
        caller: PrincipalId,
        target: PrincipalId,
        decision: Decision,
    ) -> ServiceResult<Principal> {
        let caller = self.authz.load(caller).await?;
        let current = self.find(target).await?;

        if current.as_ref().is_some_and(|p| p.role.is_main()) {
            tracing::warn!(caller = %caller.id, target = %target, "decision on main admin refused");
            return Err(ServiceError::ProtectedPrincipal);
        }
        if !caller.role.is_main() {
            tracing::warn!(caller = %caller.id, target = %target, "decision by non-main admin refused");
            return Err(ServiceError::PermissionDenied);
        }
        let current = current
            .filter(|p| p.role.is_admin())
            .ok_or(ServiceError::InvalidTarget)?;

        let next = Role::from_decision(decision);
        if current.role == next {
            return Ok(current);
        }
        if !matches!(
            (current.role, next),
            (Role::PendingAdmin, _) | (Role::ApprovedAdmin, Role::RejectedAdmin)
        ) {
            return Err(ServiceError::AlreadyDecided);
        }

        let updated = self
            .deadline
            .run(
                "principals.compare_and_set_role",
                self.credentials.compare_and_set_role(
                    target,
                    current.role,
                    next,
                    caller.id,
                    self.clock.now(),
                ),
            )
            .await?;

        match updated {
            Some(principal) => {
                tracing::info!(
                    caller = %caller.id,
                    target = %target,
                    from = %current.role,
                    to = %next,
                    "admin decision recorded"
                );
                Ok(principal)
            }
            // Lost a race: converge if the winner made the same call.
            None => match self.find(target).await? {
                Some(principal) if principal.role == next => Ok(principal),
                _ => Err(ServiceError::AlreadyDecided),
            },
        }
    }

    /// Make sure a main admin exists. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a different principal is already main admin
    /// - `InvalidCredential` if the identifier belongs to a principal whose
    ///   password does not match
    pub async fn bootstrap_main(
        &self,
        identifier: &str,
        display_name: Option<&str>,
        secret: &str,
    ) -> ServiceResult<BootstrapOutcome> {
        let parsed = Identifier::parse(identifier).map_err(ValidationError::from)?;

        if let Some(main) = self
            .deadline
            .run("principals.find_main", self.credentials.find_main())
            .await?
        {
            return if main.identifier == parsed {
                Ok(BootstrapOutcome::AlreadyPresent(main))
            } else {
                Err(ServiceError::Conflict("a different main admin exists"))
            };
        }

        if let Some(existing) = self
            .deadline
            .run(
                "principals.find_by_identifier",
                self.credentials.find_by_identifier(&parsed),
            )
            .await?
        {
            if !self.hasher.verify(secret, &existing.password) {
                return Err(ServiceError::InvalidCredential);
            }
            let promoted = match self
                .deadline
                .run("principals.set_main", self.credentials.set_main(existing.id))
                .await
            {
                Ok(p) => p,
                Err(RepositoryError::Conflict(_)) => {
                    return Err(ServiceError::Conflict("a different main admin exists"));
                }
                Err(e) => return Err(e.into()),
            };
            tracing::info!(principal_id = %promoted.id, "existing principal promoted to main admin");
            return Ok(BootstrapOutcome::Promoted(promoted));
        }

        let principal = self.new_principal(identifier, display_name, secret, Role::MainAdmin)?;
        match insert_principal(self.credentials.as_ref(), self.deadline, &principal).await {
            Ok(()) => {}
            Err(ServiceError::DuplicateIdentifier) => {
                return Err(ServiceError::Conflict("main admin bootstrap raced"));
            }
            Err(e) => return Err(e),
        }
        tracing::info!(principal_id = %principal.id, "main admin created");
        Ok(BootstrapOutcome::Created(principal))
    }

    fn new_principal(
        &self,
        identifier: &str,
        display_name: Option<&str>,
        secret: &str,
        role: Role,
    ) -> ServiceResult<Principal> {
        let identifier = Identifier::parse(identifier).map_err(ValidationError::from)?;
        validate_password(secret, self.password_min_length)?;

        let display_name = display_name
            .map(sanitize_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| identifier.to_string());

        Ok(Principal {
            id: PrincipalId::generate(),
            contact_address: Email::parse(identifier.as_str()).ok(),
            identifier,
            display_name,
            password: self.hasher.hash(secret)?,
            role,
            created_at: self.clock.now(),
            decided_by: None,
            decided_at: None,
        })
    }

    async fn find(&self, id: PrincipalId) -> ServiceResult<Option<Principal>> {
        Ok(self
            .deadline
            .run("principals.find_by_id", self.credentials.find_by_id(id))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;
    use crate::services::SessionManager;

    const SECRET: &str = "correct horse";

    fn service() -> AdminApprovalService {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::default());
        let deadline = StoreDeadline::new(Duration::from_secs(5));
        let sessions = SessionManager::new(
            store.clone(),
            clock.clone(),
            Duration::from_secs(3600),
            deadline,
        );
        let authz = Authorizer::new(store.clone(), sessions, deadline);
        AdminApprovalService::new(
            store,
            authz,
            PasswordHasher::insecure_fast(),
            clock,
            deadline,
            8,
        )
    }

    async fn main_admin(service: &AdminApprovalService) -> Principal {
        service
            .bootstrap_main("owner", Some("Owner"), SECRET)
            .await
            .unwrap()
            .principal()
            .clone()
    }

    #[tokio::test]
    async fn test_request_starts_pending_and_blocks_resubmission() {
        let service = service();
        let bob = service.request_access("Bob", None, SECRET).await.unwrap();
        assert_eq!(bob.role, Role::PendingAdmin);
        assert_eq!(bob.display_name, "bob");

        let again = service.request_access("bob", None, SECRET).await.unwrap_err();
        assert!(matches!(again, ServiceError::DuplicateIdentifier));
    }

    #[tokio::test]
    async fn test_rejected_identifier_cannot_resubmit() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();
        service
            .decide(main.id, bob.id, Decision::Rejected)
            .await
            .unwrap();

        assert!(matches!(
            service.request_access("bob", None, SECRET).await,
            Err(ServiceError::DuplicateIdentifier)
        ));
    }

    #[tokio::test]
    async fn test_decide_is_idempotent() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();

        let first = service
            .decide(main.id, bob.id, Decision::Approved)
            .await
            .unwrap();
        let second = service
            .decide(main.id, bob.id, Decision::Approved)
            .await
            .unwrap();
        assert_eq!(first.role, Role::ApprovedAdmin);
        assert_eq!(second.role, Role::ApprovedAdmin);
        assert_eq!(second.decided_by, Some(main.id));
        assert_eq!(second.decided_at, first.decided_at);
    }

    #[tokio::test]
    async fn test_non_main_cannot_decide() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();
        let eve = service.request_access("eve", None, SECRET).await.unwrap();
        service
            .decide(main.id, bob.id, Decision::Approved)
            .await
            .unwrap();
        service
            .decide(main.id, eve.id, Decision::Approved)
            .await
            .unwrap();

        let err = service
            .decide(eve.id, bob.id, Decision::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied));
        assert_eq!(service.find(bob.id).await.unwrap().unwrap().role, Role::ApprovedAdmin);
    }

    #[tokio::test]
    async fn test_main_admin_is_protected_from_everyone() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();

        assert!(matches!(
            service.decide(main.id, main.id, Decision::Rejected).await,
            Err(ServiceError::ProtectedPrincipal)
        ));
        assert!(matches!(
            service.decide(bob.id, main.id, Decision::Rejected).await,
            Err(ServiceError::ProtectedPrincipal)
        ));
    }

    #[tokio::test]
    async fn test_invalid_targets() {
        let service = service();
        let main = main_admin(&service).await;

        assert!(matches!(
            service
                .decide(main.id, PrincipalId::generate(), Decision::Approved)
                .await,
            Err(ServiceError::InvalidTarget)
        ));
    }

    #[tokio::test]
    async fn test_revocation_allowed_but_rejection_is_final() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();

        service
            .decide(main.id, bob.id, Decision::Approved)
            .await
            .unwrap();
        let revoked = service
            .decide(main.id, bob.id, Decision::Rejected)
            .await
            .unwrap();
        assert_eq!(revoked.role, Role::RejectedAdmin);

        assert!(matches!(
            service.decide(main.id, bob.id, Decision::Approved).await,
            Err(ServiceError::AlreadyDecided)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_decisions_converge() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();

        let (a, b) = tokio::join!(
            service.decide(main.id, bob.id, Decision::Approved),
            service.decide(main.id, bob.id, Decision::Approved),
        );
        assert_eq!(a.unwrap().role, Role::ApprovedAdmin);
        assert_eq!(b.unwrap().role, Role::ApprovedAdmin);
    }

    #[tokio::test]
    async fn test_listing_requires_main() {
        let service = service();
        let main = main_admin(&service).await;
        let bob = service.request_access("bob", None, SECRET).await.unwrap();
        service.request_access("carol", None, SECRET).await.unwrap();

        let pending = service.list_pending(main.id).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(service.list_admins(main.id).await.unwrap().len(), 3);

        assert!(matches!(
            service.list_pending(bob.id).await,
            Err(ServiceError::PermissionDenied)
        ));
        assert!(matches!(
            service.list_admins(bob.id).await,
            Err(ServiceError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent_and_exclusive() {
        let service = service();
        assert!(matches!(
            service.bootstrap_main("owner", None, SECRET).await.unwrap(),
            BootstrapOutcome::Created(_)
        ));
        assert!(matches!(
            service.bootstrap_main("OWNER", None, SECRET).await.unwrap(),
            BootstrapOutcome::AlreadyPresent(_)
        ));
        assert!(matches!(
            service.bootstrap_main("someone", None, SECRET).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_promotes_existing_principal_with_matching_password() {
        let service = service();
        service.request_access("bob", None, SECRET).await.unwrap();

        assert!(matches!(
            service.bootstrap_main("bob", None, "not the password").await,
            Err(ServiceError::InvalidCredential)
        ));
        let outcome = service.bootstrap_main("bob", None, SECRET).await.unwrap();
        assert!(matches!(outcome, BootstrapOutcome::Promoted(_)));
        assert_eq!(outcome.principal().role, Role::MainAdmin);
    }
}
