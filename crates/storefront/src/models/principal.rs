//! Principal domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fashion_hub_core::{Email, Identifier, PasswordDigest, PrincipalId, Role};

/// A customer or admin account.
///
/// Principals are never hard-deleted. Rejected admins stay on record with
/// [`Role::RejectedAdmin`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: PrincipalId,
    /// Case-normalized login identifier. Unique across all principals.
    pub identifier: Identifier,
    pub display_name: String,
    pub contact_address: Option<Email>,
    pub password: PasswordDigest,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// Who last changed `role` through an approval decision.
    pub decided_by: Option<PrincipalId>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// The public projection of a [`Principal`]. Carries no password material.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalView {
    pub id: PrincipalId,
    pub identifier: Identifier,
    pub display_name: String,
    pub contact_address: Option<Email>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub decided_by: Option<PrincipalId>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            identifier: principal.identifier.clone(),
            display_name: principal.display_name.clone(),
            contact_address: principal.contact_address.clone(),
            role: principal.role,
            created_at: principal.created_at,
            decided_by: principal.decided_by,
            decided_at: principal.decided_at,
        }
    }
}

impl From<Principal> for PrincipalView {
    fn from(principal: Principal) -> Self {
        Self::from(&principal)
    }
}
