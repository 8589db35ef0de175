//! Payment verification requests.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fashion_hub_core::{OrderCode, PrincipalId, VerificationId, VerificationStatus};

/// A customer's claim that an order has been paid.
///
/// Decided exactly once by an approved admin. Only a request that becomes
/// `Verified` may mark its order as paid.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerification {
    pub id: VerificationId,
    pub order_code: OrderCode,
    pub claimed_transaction_id: String,
    pub method: String,
    pub submitted_by: PrincipalId,
    pub status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub decided_by: Option<PrincipalId>,
    pub decided_at: Option<DateTime<Utc>>,
}
