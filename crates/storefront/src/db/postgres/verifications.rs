//! Payment verification queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fashion_hub_core::{OrderCode, PrincipalId, VerificationId, VerificationStatus};

use super::PgStore;
use crate::db::{RepositoryError, VerificationStore};
use crate::models::PaymentVerification;

const VERIFICATION_COLUMNS: &str = "id, order_code, claimed_transaction_id, method, submitted_by, \
     status, created_at, decided_by, decided_at";

#[derive(sqlx::FromRow)]
struct VerificationRow {
    id: VerificationId,
    order_code: String,
    claimed_transaction_id: String,
    method: String,
    submitted_by: PrincipalId,
    status: VerificationStatus,
    created_at: DateTime<Utc>,
    decided_by: Option<PrincipalId>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<VerificationRow> for PaymentVerification {
    type Error = RepositoryError;

    fn try_from(row: VerificationRow) -> Result<Self, Self::Error> {
        let order_code = OrderCode::parse(&row.order_code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order code in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_code,
            claimed_transaction_id: row.claimed_transaction_id,
            method: row.method,
            submitted_by: row.submitted_by,
            status: row.status,
            created_at: row.created_at,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
        })
    }
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn insert(&self, verification: &PaymentVerification) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO payment_verifications
                (id, order_code, claimed_transaction_id, method, submitted_by, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(verification.id)
        .bind(verification.order_code.as_str())
        .bind(&verification.claimed_transaction_id)
        .bind(&verification.method)
        .bind(verification.submitted_by)
        .bind(verification.status)
        .bind(verification.created_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        id: VerificationId,
    ) -> Result<Option<PaymentVerification>, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationRow>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM payment_verifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(PaymentVerification::try_from).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<PaymentVerification>, RepositoryError> {
        let rows = sqlx::query_as::<_, VerificationRow>(&format!(
            r"
            SELECT {VERIFICATION_COLUMNS} FROM payment_verifications
            WHERE status = 'pending'
            ORDER BY created_at
            "
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(PaymentVerification::try_from).collect()
    }

    async fn decide(
        &self,
        id: VerificationId,
        status: VerificationStatus,
        decided_by: PrincipalId,
        decided_at: DateTime<Utc>,
    ) -> Result<Option<PaymentVerification>, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationRow>(&format!(
            r"
            UPDATE payment_verifications
            SET status = $2, decided_by = $3, decided_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {VERIFICATION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .bind(decided_by)
        .bind(decided_at)
        .fetch_optional(self.pool())
        .await?;

        row.map(PaymentVerification::try_from).transpose()
    }
}
