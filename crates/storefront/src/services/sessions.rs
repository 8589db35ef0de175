//! Bearer session issuance, validation, and revocation.
//!
//! TTL is fixed at issuance; there is no sliding renewal. Expiry is checked
//! lazily on validation, and an expired session is deleted the first time it
//! is presented.

use std::sync::Arc;
use std::time::Duration;

use fashion_hub_core::PrincipalId;

use super::{ServiceError, ServiceResult, StoreDeadline};
use crate::clock::{Clock, span};
use crate::db::SessionStore;
use crate::models::{IssuedSession, Session, SessionLookup, SessionToken};

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    deadline: StoreDeadline,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            store,
            clock,
            ttl: span(ttl),
            deadline,
        }
    }

    /// Issue a new session for `principal_id`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UpstreamUnavailable` if the session cannot be stored.
    pub async fn issue(&self, principal_id: PrincipalId) -> ServiceResult<IssuedSession> {
        let token = SessionToken::generate();
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(ServiceError::UpstreamUnavailable)?;

        let session = Session {
            token_hash: token.hash(),
            principal_id,
            issued_at,
            expires_at,
        };
        self.deadline
            .run("sessions.insert", self.store.insert(&session))
            .await?;

        tracing::debug!(principal_id = %principal_id, %expires_at, "session issued");
        Ok(IssuedSession { token, session })
    }

    /// Look up a presented token.
    ///
    /// The returned session identifies the principal only; callers re-read
    /// the principal for its current role.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UpstreamUnavailable` on storage faults.
    pub async fn validate(&self, token: &SessionToken) -> ServiceResult<SessionLookup> {
        let hash = token.hash();
        let Some(session) = self
            .deadline
            .run("sessions.find", self.store.find(&hash))
            .await?
        else {
            return Ok(SessionLookup::NotFound);
        };

        if session.is_expired(self.clock.now()) {
            self.deadline
                .run("sessions.delete", self.store.delete(&hash))
                .await?;
            tracing::debug!(principal_id = %session.principal_id, "expired session removed");
            return Ok(SessionLookup::Expired);
        }

        Ok(SessionLookup::Active(session))
    }

    /// Delete a session unconditionally. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UpstreamUnavailable` on storage faults.
    pub async fn revoke(&self, token: &SessionToken) -> ServiceResult<bool> {
        Ok(self
            .deadline
            .run("sessions.delete", self.store.delete(&token.hash()))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;

    fn manager() -> (SessionManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let manager = SessionManager::new(
            Arc::new(MemoryStore::default()),
            clock.clone(),
            Duration::from_secs(60 * 60),
            StoreDeadline::new(Duration::from_secs(1)),
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn test_validate_right_after_issue() {
        let (manager, _) = manager();
        let principal = PrincipalId::generate();
        let issued = manager.issue(principal).await.unwrap();

        match manager.validate(&issued.token).await.unwrap() {
            SessionLookup::Active(session) => assert_eq!(session.principal_id, principal),
            other => panic!("expected active session, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_deleted_not_flagged() {
        let (manager, clock) = manager();
        let issued = manager.issue(PrincipalId::generate()).await.unwrap();

        clock.advance(ChronoDuration::hours(1) + ChronoDuration::milliseconds(1));
        assert_eq!(
            manager.validate(&issued.token).await.unwrap(),
            SessionLookup::Expired
        );

        // Rewinding time does not bring it back.
        clock.advance(ChronoDuration::hours(-2));
        assert_eq!(
            manager.validate(&issued.token).await.unwrap(),
            SessionLookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_session_valid_until_exact_expiry() {
        let (manager, clock) = manager();
        let issued = manager.issue(PrincipalId::generate()).await.unwrap();

        clock.advance(ChronoDuration::hours(1));
        assert!(matches!(
            manager.validate(&issued.token).await.unwrap(),
            SessionLookup::Active(_)
        ));
    }

    #[tokio::test]
    async fn test_revoke() {
        let (manager, _) = manager();
        let issued = manager.issue(PrincipalId::generate()).await.unwrap();

        assert!(manager.revoke(&issued.token).await.unwrap());
        assert!(!manager.revoke(&issued.token).await.unwrap());
        assert_eq!(
            manager.validate(&issued.token).await.unwrap(),
            SessionLookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_relogin_replaces_previous_session() {
        let (manager, _) = manager();
        let principal = PrincipalId::generate();
        let first = manager.issue(principal).await.unwrap();
        let second = manager.issue(principal).await.unwrap();

        assert_eq!(
            manager.validate(&first.token).await.unwrap(),
            SessionLookup::NotFound
        );
        assert!(matches!(
            manager.validate(&second.token).await.unwrap(),
            SessionLookup::Active(_)
        ));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (manager, _) = manager();
        let token = SessionToken::from_client("not-a-real-token");
        assert_eq!(
            manager.validate(&token).await.unwrap(),
            SessionLookup::NotFound
        );
    }
}
