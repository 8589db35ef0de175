//! Payment claims and their verification.
//!
//! Accepting a claim is a two-step write: the verification is marked
//! `verified` first, then the order is marked paid. The first write is
//! conditional on the request still being pending, so a repeated decision
//! can never reach the order a second time. If the order write fails after
//! the verification is recorded, the caller gets `PartialFailure` and an
//! operator reconciles; nothing is retried here.

use std::sync::Arc;

use fashion_hub_core::{
    OrderCode, PaymentStatus, PrincipalId, VerificationId, VerificationStatus, sanitize_text,
};

use super::{Authorizer, OrderFeed, ServiceError, ServiceResult, StoreDeadline, ValidationError};
use crate::clock::Clock;
use crate::db::{OrderStore, VerificationStore};
use crate::models::{Order, OrderEventKind, PaymentMark, PaymentVerification};

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderStore>,
    verifications: Arc<dyn VerificationStore>,
    authz: Authorizer,
    feed: OrderFeed,
    clock: Arc<dyn Clock>,
    deadline: StoreDeadline,
}

impl PaymentService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        verifications: Arc<dyn VerificationStore>,
        authz: Authorizer,
        feed: OrderFeed,
        clock: Arc<dyn Clock>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            orders,
            verifications,
            authz,
            feed,
            clock,
            deadline,
        }
    }

    /// Record a claimed payment for review. Leaves the order untouched.
    ///
    /// `method` defaults to the order's payment method.
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing transaction id or an already paid order
    /// - `NotFound` if the order does not exist
    /// - `PermissionDenied` if the order belongs to someone else
    pub async fn submit(
        &self,
        order_code: &str,
        claimed_transaction_id: &str,
        method: Option<&str>,
        caller: PrincipalId,
    ) -> ServiceResult<PaymentVerification> {
        let principal = self.authz.load(caller).await?;
        let order_code = OrderCode::parse(order_code).map_err(ValidationError::from)?;
        let transaction_id = sanitize_text(claimed_transaction_id);
        if transaction_id.is_empty() {
            return Err(ValidationError::MissingField("transaction id").into());
        }

        let order = self.find_order(&order_code).await?;
        let foreign = order.owner.is_some_and(|owner| owner != principal.id);
        if foreign && !principal.role.is_approved_admin() {
            tracing::warn!(code = %order.code, principal_id = %caller, "payment claim on foreign order refused");
            return Err(ServiceError::PermissionDenied);
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(ValidationError::AlreadyPaid.into());
        }

        let method = method
            .map(sanitize_text)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| order.payment_method.clone());

        let verification = PaymentVerification {
            id: VerificationId::generate(),
            order_code,
            claimed_transaction_id: transaction_id,
            method,
            submitted_by: principal.id,
            status: VerificationStatus::Pending,
            created_at: self.clock.now(),
            decided_by: None,
            decided_at: None,
        };
        self.deadline
            .run(
                "verifications.insert",
                self.verifications.insert(&verification),
            )
            .await?;

        tracing::info!(
            verification_id = %verification.id,
            code = %verification.order_code,
            submitted_by = %principal.id,
            "payment verification submitted"
        );
        Ok(verification)
    }

    /// Accept or reject a pending claim. Approved admins only.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` unless the caller is an approved admin
    /// - `NotFound` if the verification or its order is missing
    /// - `AlreadyDecided` if the request is no longer pending
    /// - `PartialFailure` if the claim was accepted but the order could not
    ///   be marked paid
    pub async fn decide(
        &self,
        verification_id: VerificationId,
        caller: PrincipalId,
        accept: bool,
    ) -> ServiceResult<PaymentVerification> {
        let admin = self.authz.require_approved_admin(caller).await?;

        let pending = self
            .deadline
            .run(
                "verifications.find",
                self.verifications.find(verification_id),
            )
            .await?
            .ok_or(ServiceError::NotFound("payment verification"))?;
        if !pending.status.is_pending() {
            return Err(ServiceError::AlreadyDecided);
        }
        self.find_order(&pending.order_code).await?;

        let status = if accept {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Rejected
        };
        let now = self.clock.now();
        let decided = self
            .deadline
            .run(
                "verifications.decide",
                self.verifications
                    .decide(verification_id, status, admin.id, now),
            )
            .await?
            .ok_or(ServiceError::AlreadyDecided)?;

        tracing::info!(
            %verification_id,
            code = %decided.order_code,
            decided_by = %admin.id,
            accept,
            "payment verification decided"
        );

        if accept {
            self.mark_order_paid(&decided, admin.id).await?;
        }
        Ok(decided)
    }

    /// Pending claims, oldest first. Approved admins only.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller is an approved admin.
    pub async fn list_pending(&self, caller: PrincipalId) -> ServiceResult<Vec<PaymentVerification>> {
        self.authz.require_approved_admin(caller).await?;
        Ok(self
            .deadline
            .run(
                "verifications.list_pending",
                self.verifications.list_pending(),
            )
            .await?)
    }

    async fn mark_order_paid(
        &self,
        verification: &PaymentVerification,
        admin: PrincipalId,
    ) -> ServiceResult<()> {
        let partial = || ServiceError::PartialFailure {
            verification_id: verification.id,
            order_code: verification.order_code.to_string(),
        };

        let marked = self
            .deadline
            .run(
                "orders.mark_paid",
                self.orders.mark_paid(
                    &verification.order_code,
                    &verification.claimed_transaction_id,
                    admin,
                    self.clock.now(),
                ),
            )
            .await;

        match marked {
            Ok(PaymentMark::Marked(order)) => {
                tracing::info!(code = %order.code, "order marked paid");
                self.feed.publish(OrderEventKind::Paid, &order);
                Ok(())
            }
            Ok(PaymentMark::AlreadyPaid(order)) => {
                tracing::warn!(
                    code = %order.code,
                    verification_id = %verification.id,
                    "order was already paid; payment id left unchanged"
                );
                Ok(())
            }
            Ok(PaymentMark::Missing) => {
                tracing::error!(
                    verification_id = %verification.id,
                    code = %verification.order_code,
                    "verified payment refers to a missing order"
                );
                Err(partial())
            }
            Err(e) => {
                tracing::error!(
                    verification_id = %verification.id,
                    code = %verification.order_code,
                    error = %e,
                    "verified payment could not be applied to its order"
                );
                Err(partial())
            }
        }
    }

    async fn find_order(&self, code: &OrderCode) -> ServiceResult<Order> {
        self.deadline
            .run("orders.find", self.orders.find(code))
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use fashion_hub_core::{Identifier, OrderStatus, PasswordDigest, Role};

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{CredentialStore, MemoryStore};
    use crate::models::{CustomerSnapshot, Principal};
    use crate::services::SessionManager;

    struct Fixture {
        service: PaymentService,
        store: Arc<MemoryStore>,
        feed: OrderFeed,
    }

    fn fixture() -> Fixture {
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
        let feed = OrderFeed::default();
        let service = PaymentService::new(
            store.clone(),
            store.clone(),
            authz,
            feed.clone(),
            clock,
            deadline,
        );
        Fixture {
            service,
            store,
            feed,
        }
    }

    async fn principal(f: &Fixture, identifier: &str, role: Role) -> Principal {
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
        CredentialStore::insert(f.store.as_ref(), &principal)
            .await
            .unwrap();
        principal
    }

    async fn order(f: &Fixture, owner: Option<PrincipalId>) -> Order {
        let now = Utc::now();
        let order = Order {
            code: OrderCode::generate(now, &mut rand::rng()),
            owner,
            items: Vec::new(),
            total: Decimal::from(1200),
            status: OrderStatus::OrderPlaced,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_method: "UPI".to_owned(),
            branch: "Pune".to_owned(),
            location: None,
            customer: CustomerSnapshot::default(),
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        OrderStore::insert(f.store.as_ref(), &order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_submit_leaves_order_pending() {
        let f = fixture();
        let asha = principal(&f, "asha", Role::Customer).await;
        let placed = order(&f, Some(asha.id)).await;

        let verification = f
            .service
            .submit(placed.code.as_str(), " TXN<123> ", None, asha.id)
            .await
            .unwrap();
        assert_eq!(verification.status, VerificationStatus::Pending);
        assert_eq!(verification.claimed_transaction_id, "TXN123");
        assert_eq!(verification.method, "UPI");

        let stored = OrderStore::find(f.store.as_ref(), &placed.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_rules() {
        let f = fixture();
        let asha = principal(&f, "asha", Role::Customer).await;
        let ravi = principal(&f, "ravi", Role::Customer).await;
        let placed = order(&f, Some(asha.id)).await;
        let guest = order(&f, None).await;

        assert!(matches!(
            f.service
                .submit(placed.code.as_str(), "TXN1", None, ravi.id)
                .await,
            Err(ServiceError::PermissionDenied)
        ));
        assert!(matches!(
            f.service.submit(placed.code.as_str(), "  ", None, asha.id).await,
            Err(ServiceError::Validation(ValidationError::MissingField(_)))
        ));
        assert!(
            f.service
                .submit(guest.code.as_str(), "TXN2", Some("Card"), ravi.id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_accept_marks_order_paid_once() {
        let f = fixture();
        let admin = principal(&f, "admin", Role::ApprovedAdmin).await;
        let asha = principal(&f, "asha", Role::Customer).await;
        let placed = order(&f, Some(asha.id)).await;
        let claim = f
            .service
            .submit(placed.code.as_str(), "TXN1", None, asha.id)
            .await
            .unwrap();
        let mut subscription = f.feed.subscribe();

        let decided = f.service.decide(claim.id, admin.id, true).await.unwrap();
        assert_eq!(decided.status, VerificationStatus::Verified);
        assert_eq!(decided.decided_by, Some(admin.id));

        let paid = OrderStore::find(f.store.as_ref(), &placed.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_id.as_deref(), Some("TXN1"));
        assert_eq!(subscription.next().await.unwrap().kind, OrderEventKind::Paid);

        assert!(matches!(
            f.service.decide(claim.id, admin.id, true).await,
            Err(ServiceError::AlreadyDecided)
        ));
        assert!(matches!(
            f.service
                .submit(placed.code.as_str(), "TXN9", None, asha.id)
                .await,
            Err(ServiceError::Validation(ValidationError::AlreadyPaid))
        ));
    }

    #[tokio::test]
    async fn test_reject_leaves_order_untouched() {
        let f = fixture();
        let admin = principal(&f, "admin", Role::MainAdmin).await;
        let placed = order(&f, None).await;
        let claim = f
            .service
            .submit(placed.code.as_str(), "TXN1", None, admin.id)
            .await
            .unwrap();

        let decided = f.service.decide(claim.id, admin.id, false).await.unwrap();
        assert_eq!(decided.status, VerificationStatus::Rejected);

        let stored = OrderStore::find(f.store.as_ref(), &placed.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert!(stored.payment_id.is_none());
    }

    #[tokio::test]
    async fn test_decide_requires_approved_admin() {
        let f = fixture();
        let pending = principal(&f, "pending", Role::PendingAdmin).await;
        let asha = principal(&f, "asha", Role::Customer).await;
        let placed = order(&f, Some(asha.id)).await;
        let claim = f
            .service
            .submit(placed.code.as_str(), "TXN1", None, asha.id)
            .await
            .unwrap();

        assert!(matches!(
            f.service.decide(claim.id, pending.id, true).await,
            Err(ServiceError::PermissionDenied)
        ));
        assert!(matches!(
            f.service.list_pending(asha.id).await,
            Err(ServiceError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_unknown_verification() {
        let f = fixture();
        let admin = principal(&f, "admin", Role::ApprovedAdmin).await;
        assert!(matches!(
            f.service
                .decide(VerificationId::generate(), admin.id, true)
                .await,
            Err(ServiceError::NotFound("payment verification"))
        ));
    }

    #[tokio::test]
    async fn test_second_accepted_claim_keeps_first_payment_id() {
        let f = fixture();
        let admin = principal(&f, "admin", Role::ApprovedAdmin).await;
        let placed = order(&f, None).await;
        let first = f
            .service
            .submit(placed.code.as_str(), "TXN1", None, admin.id)
            .await
            .unwrap();
        let second = f
            .service
            .submit(placed.code.as_str(), "TXN2", None, admin.id)
            .await
            .unwrap();

        f.service.decide(first.id, admin.id, true).await.unwrap();
        f.service.decide(second.id, admin.id, true).await.unwrap();

        let stored = OrderStore::find(f.store.as_ref(), &placed.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_id.as_deref(), Some("TXN1"));
        assert_eq!(f.service.list_pending(admin.id).await.unwrap().len(), 0);
    }
}
