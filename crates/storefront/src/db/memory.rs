//! In-process store backend.
//!
//! Each collection sits behind its own `tokio::sync::RwLock`. Conditional
//! writes check and mutate under one write guard, which gives them the same
//! compare-and-set semantics as the `PostgreSQL` `UPDATE ... WHERE` queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use fashion_hub_core::{
    Identifier, OrderCode, OrderStatus, PaymentStatus, PrincipalId, Role, VerificationId,
    VerificationStatus,
};

use super::{CredentialStore, OrderStore, RepositoryError, SessionStore, VerificationStore};
use crate::models::{
    Order, PaymentMark, PaymentVerification, Principal, Session, StatusUpdate, TokenHash,
};

#[derive(Default)]
struct Principals {
    by_id: HashMap<PrincipalId, Principal>,
    by_identifier: HashMap<Identifier, PrincipalId>,
}

/// Process-local implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    principals: RwLock<Principals>,
    sessions: RwLock<HashMap<TokenHash, Session>>,
    orders: RwLock<HashMap<OrderCode, Order>>,
    verifications: RwLock<HashMap<VerificationId, PaymentVerification>>,
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.code.cmp(&a.code))
    });
    orders
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, RepositoryError> {
        let principals = self.principals.read().await;
        Ok(principals
            .by_identifier
            .get(identifier)
            .and_then(|id| principals.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepositoryError> {
        Ok(self.principals.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, principal: &Principal) -> Result<(), RepositoryError> {
        let mut principals = self.principals.write().await;
        if principals.by_identifier.contains_key(&principal.identifier) {
            return Err(RepositoryError::Conflict(
                "identifier already exists".to_owned(),
            ));
        }
        if principal.role.is_main() && principals.by_id.values().any(|p| p.role.is_main()) {
            return Err(RepositoryError::Conflict(
                "a main admin already exists".to_owned(),
            ));
        }
        principals
            .by_identifier
            .insert(principal.identifier.clone(), principal.id);
        principals.by_id.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn compare_and_set_role(
        &self,
        id: PrincipalId,
        expected: Role,
        new: Role,
        decided_by: PrincipalId,
        decided_at: DateTime<Utc>,
    ) -> Result<Option<Principal>, RepositoryError> {
        let mut principals = self.principals.write().await;
        match principals.by_id.get_mut(&id) {
            Some(principal) if principal.role == expected => {
                principal.role = new;
                principal.decided_by = Some(decided_by);
                principal.decided_at = Some(decided_at);
                Ok(Some(principal.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_main(&self, id: PrincipalId) -> Result<Principal, RepositoryError> {
        let mut principals = self.principals.write().await;
        if principals
            .by_id
            .values()
            .any(|p| p.role.is_main() && p.id != id)
        {
            return Err(RepositoryError::Conflict(
                "a different main admin exists".to_owned(),
            ));
        }
        let principal = principals
            .by_id
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        principal.role = Role::MainAdmin;
        Ok(principal.clone())
    }

    async fn find_main(&self) -> Result<Option<Principal>, RepositoryError> {
        Ok(self
            .principals
            .read()
            .await
            .by_id
            .values()
            .find(|p| p.role.is_main())
            .cloned())
    }

    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<Principal>, RepositoryError> {
        let mut matching: Vec<Principal> = self
            .principals
            .read()
            .await
            .by_id
            .values()
            .filter(|p| roles.contains(&p.role))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(matching)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| existing.principal_id != session.principal_id);
        sessions.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, token_hash: &TokenHash) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepositoryError> {
        Ok(self.sessions.write().await.remove(token_hash).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.code) {
            return Err(RepositoryError::Conflict(
                "order code already exists".to_owned(),
            ));
        }
        orders.insert(order.code.clone(), order.clone());
        Ok(())
    }

    async fn find(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(code).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await.values().cloned().collect();
        Ok(newest_first(orders))
    }

    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.owner == Some(owner))
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn update_status(
        &self,
        code: &OrderCode,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(code) {
            Some(order) if order.status == expected => {
                order.status = update.status;
                if update.location.is_some() {
                    order.location.clone_from(&update.location);
                }
                order.updated_by = Some(update.updated_by);
                order.updated_at = update.updated_at;
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_paid(
        &self,
        code: &OrderCode,
        payment_id: &str,
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> Result<PaymentMark, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(code) else {
            return Ok(PaymentMark::Missing);
        };
        if order.payment_status == PaymentStatus::Paid {
            return Ok(PaymentMark::AlreadyPaid(order.clone()));
        }
        order.payment_status = PaymentStatus::Paid;
        order.payment_id = Some(payment_id.to_owned());
        order.updated_by = Some(updated_by);
        order.updated_at = updated_at;
        Ok(PaymentMark::Marked(order.clone()))
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn insert(&self, verification: &PaymentVerification) -> Result<(), RepositoryError> {
        self.verifications
            .write()
            .await
            .insert(verification.id, verification.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: VerificationId,
    ) -> Result<Option<PaymentVerification>, RepositoryError> {
        Ok(self.verifications.read().await.get(&id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<PaymentVerification>, RepositoryError> {
        let mut pending: Vec<PaymentVerification> = self
            .verifications
            .read()
            .await
            .values()
            .filter(|v| v.status.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|v| v.created_at);
        Ok(pending)
    }

    async fn decide(
        &self,
        id: VerificationId,
        status: VerificationStatus,
        decided_by: PrincipalId,
        decided_at: DateTime<Utc>,
    ) -> Result<Option<PaymentVerification>, RepositoryError> {
        let mut verifications = self.verifications.write().await;
        match verifications.get_mut(&id) {
            Some(verification) if verification.status.is_pending() => {
                verification.status = status;
                verification.decided_by = Some(decided_by);
                verification.decided_at = Some(decided_at);
                Ok(Some(verification.clone()))
            }
            _ => Ok(None),
        }
    }
}
