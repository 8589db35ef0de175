//! One-time passcode login for customers.
//!
//! A code is a string of `otp_length` decimal digits, valid for
//! `otp_validity` and usable once. Only its SHA-256 digest is kept. Wrong
//! codes count against the same per-identifier limiter as password logins.
//!
//! Requesting a code for an unknown identifier succeeds silently, so the
//! endpoint does not reveal which identifiers are registered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use fashion_hub_core::{Identifier, Role};

use super::{
    Admission, AttemptOutcome, LoginOutcome, LoginRateLimiter, ServiceError, ServiceResult,
    SessionManager, StoreDeadline, ValidationError,
};
use crate::clock::{Clock, span};
use crate::db::CredentialStore;
use crate::models::Principal;

/// Upper bound on outstanding codes.
const MAX_OUTSTANDING_CODES: u64 = 50_000;

/// Delivery of a code failed.
#[derive(Debug, Error)]
#[error("code delivery failed: {0}")]
pub struct CodeSendError(pub String);

/// Delivers a one-time code to a principal (SMS, email, ...).
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send(&self, principal: &Principal, code: &str) -> Result<(), CodeSendError>;
}

/// Logs that a code was dispatched. Never logs the code.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCodeSender;

#[async_trait]
impl CodeSender for LogCodeSender {
    async fn send(&self, principal: &Principal, code: &str) -> Result<(), CodeSendError> {
        tracing::info!(
            principal_id = %principal.id,
            digits = code.len(),
            "one-time code dispatched"
        );
        Ok(())
    }
}

#[derive(Clone)]
struct PendingCode {
    digest: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OtpService {
    credentials: Arc<dyn CredentialStore>,
    limiter: LoginRateLimiter,
    sessions: SessionManager,
    sender: Arc<dyn CodeSender>,
    codes: Cache<Identifier, PendingCode>,
    clock: Arc<dyn Clock>,
    deadline: StoreDeadline,
    length: u32,
    validity: chrono::Duration,
}

impl OtpService {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        limiter: LoginRateLimiter,
        sessions: SessionManager,
        sender: Arc<dyn CodeSender>,
        clock: Arc<dyn Clock>,
        deadline: StoreDeadline,
        length: u32,
        validity: Duration,
    ) -> Self {
        let codes = Cache::builder()
            .max_capacity(MAX_OUTSTANDING_CODES)
            .time_to_live(validity)
            .build();

        Self {
            credentials,
            limiter,
            sessions,
            sender,
            codes,
            clock,
            deadline,
            length,
            validity: span(validity),
        }
    }

    /// Issue a fresh code, replacing any outstanding one.
    ///
    /// # Errors
    ///
    /// - `RateLimited` while the identifier is throttled
    /// - `UpstreamUnavailable` if the code could not be delivered
    pub async fn request_code(&self, identifier: &str) -> ServiceResult<()> {
        let identifier = Identifier::parse(identifier).map_err(ValidationError::from)?;
        if self.limiter.is_blocked(&identifier).await {
            return Err(ServiceError::RateLimited);
        }

        let Some(principal) = self.find_customer(&identifier).await? else {
            tracing::debug!(identifier = %identifier, "code requested for unknown customer");
            return Ok(());
        };

        let code = generate_code(self.length);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.codes
            .insert(
                identifier.clone(),
                PendingCode {
                    digest: digest(&code),
                    expires_at,
                },
            )
            .await;

        if let Err(e) = self.sender.send(&principal, &code).await {
            self.codes.invalidate(&identifier).await;
            tracing::error!(principal_id = %principal.id, error = %e, "one-time code delivery failed");
            return Err(ServiceError::UpstreamUnavailable);
        }
        Ok(())
    }

    /// Exchange a code for a session. A correct code works once.
    ///
    /// # Errors
    ///
    /// - `RateLimited` while the identifier is throttled
    /// - `InvalidCredential` for a wrong, expired, or missing code
    pub async fn verify_code(&self, identifier: &str, code: &str) -> ServiceResult<LoginOutcome> {
        let identifier = Identifier::parse(identifier).map_err(ValidationError::from)?;
        if self.limiter.is_blocked(&identifier).await {
            return Err(ServiceError::RateLimited);
        }

        let now = self.clock.now();
        let matched = match self.codes.remove(&identifier).await {
            Some(pending) if now <= pending.expires_at => {
                if pending.digest == digest(code.trim()) {
                    true
                } else {
                    // A wrong guess does not burn the outstanding code.
                    self.codes.insert(identifier.clone(), pending).await;
                    false
                }
            }
            _ => false,
        };

        let principal = if matched {
            self.find_customer(&identifier).await?
        } else {
            None
        };
        let Some(principal) = principal else {
            return match self
                .limiter
                .check_and_record(&identifier, AttemptOutcome::Failure)
                .await
            {
                Admission::Blocked => Err(ServiceError::RateLimited),
                Admission::Allowed => Err(ServiceError::InvalidCredential),
            };
        };

        if self
            .limiter
            .check_and_record(&identifier, AttemptOutcome::Success)
            .await
            == Admission::Blocked
        {
            return Err(ServiceError::RateLimited);
        }

        let session = self.sessions.issue(principal.id).await?;
        tracing::info!(principal_id = %principal.id, "one-time code login succeeded");
        Ok(LoginOutcome { principal, session })
    }

    async fn find_customer(&self, identifier: &Identifier) -> ServiceResult<Option<Principal>> {
        let found = self
            .deadline
            .run(
                "principals.find_by_identifier",
                self.credentials.find_by_identifier(identifier),
            )
            .await?;
        Ok(found.filter(|p| p.role == Role::Customer))
    }
}

fn generate_code(length: u32) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use fashion_hub_core::{PasswordDigest, PrincipalId};

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingSender {
        fn last(&self) -> String {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CodeSender for RecordingSender {
        async fn send(&self, _principal: &Principal, code: &str) -> Result<(), CodeSendError> {
            self.sent.lock().unwrap().push(code.to_owned());
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl CodeSender for FailingSender {
        async fn send(&self, _principal: &Principal, _code: &str) -> Result<(), CodeSendError> {
            Err(CodeSendError("gateway down".to_owned()))
        }
    }

    struct Fixture {
        service: OtpService,
        sender: Arc<RecordingSender>,
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
    }

    fn fixture_with(sender: Arc<dyn CodeSender>) -> (OtpService, Arc<ManualClock>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::default());
        let deadline = StoreDeadline::new(Duration::from_secs(5));
        let sessions = SessionManager::new(
            store.clone(),
            clock.clone(),
            Duration::from_secs(3600),
            deadline,
        );
        let limiter = LoginRateLimiter::new(Duration::from_secs(900), 3, clock.clone());
        let service = OtpService::new(
            store.clone(),
            limiter,
            sessions,
            sender,
            clock.clone(),
            deadline,
            6,
            Duration::from_secs(60),
        );
        (service, clock, store)
    }

    async fn fixture() -> Fixture {
        let sender = Arc::new(RecordingSender::default());
        let (service, clock, store) = fixture_with(sender.clone());
        seed(&store, "asha@example.com", Role::Customer).await;
        Fixture {
            service,
            sender,
            clock,
            store,
        }
    }

    async fn seed(store: &MemoryStore, identifier: &str, role: Role) {
        let principal = Principal {
            id: PrincipalId::generate(),
            identifier: Identifier::parse(identifier).unwrap(),
            display_name: identifier.to_owned(),
            contact_address: None,
            password: PasswordDigest::new("unused".to_owned()),
            role,
            created_at: Utc::now(),
            decided_by: None,
            decided_at: None,
        };
        CredentialStore::insert(store, &principal).await.unwrap();
    }

    fn wrong(code: &str) -> String {
        code.chars()
            .map(|c| if c == '0' { '1' } else { '0' })
            .collect()
    }

    #[tokio::test]
    async fn test_code_shape() {
        let f = fixture().await;
        f.service.request_code("asha@example.com").await.unwrap();
        let code = f.sender.last();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let f = fixture().await;
        f.service.request_code("asha@example.com").await.unwrap();
        let code = f.sender.last();

        let outcome = f
            .service
            .verify_code("ASHA@example.com", &code)
            .await
            .unwrap();
        assert_eq!(outcome.principal.role, Role::Customer);

        assert!(matches!(
            f.service.verify_code("asha@example.com", &code).await,
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_expired_code_is_refused() {
        let f = fixture().await;
        f.service.request_code("asha@example.com").await.unwrap();
        let code = f.sender.last();

        f.clock.advance(chrono::Duration::seconds(61));
        assert!(matches!(
            f.service.verify_code("asha@example.com", &code).await,
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_wrong_guess_keeps_code_and_counts_failure() {
        let f = fixture().await;
        f.service.request_code("asha@example.com").await.unwrap();
        let code = f.sender.last();

        for _ in 0..2 {
            assert!(matches!(
                f.service.verify_code("asha@example.com", &wrong(&code)).await,
                Err(ServiceError::InvalidCredential)
            ));
        }
        assert!(f.service.verify_code("asha@example.com", &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_guesses_hit_rate_limit() {
        let f = fixture().await;
        f.service.request_code("asha@example.com").await.unwrap();
        let code = f.sender.last();

        for _ in 0..3 {
            let _ = f.service.verify_code("asha@example.com", &wrong(&code)).await;
        }
        assert!(matches!(
            f.service.verify_code("asha@example.com", &code).await,
            Err(ServiceError::RateLimited)
        ));
        assert!(matches!(
            f.service.request_code("asha@example.com").await,
            Err(ServiceError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_unknown_and_admin_identifiers_get_silent_success() {
        let f = fixture().await;
        seed(&f.store, "boss", Role::ApprovedAdmin).await;

        f.service.request_code("nobody@example.com").await.unwrap();
        f.service.request_code("boss").await.unwrap();
        assert!(f.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_upstream_unavailable() {
        let (service, _clock, store) = fixture_with(Arc::new(FailingSender));
        seed(&store, "asha@example.com", Role::Customer).await;

        assert!(matches!(
            service.request_code("asha@example.com").await,
            Err(ServiceError::UpstreamUnavailable)
        ));
    }
}
