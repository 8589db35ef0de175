//! Session queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fashion_hub_core::PrincipalId;

use super::PgStore;
use crate::db::{RepositoryError, SessionStore};
use crate::models::{Session, TokenHash};

/// One live session per principal: a new login replaces the row in a single
/// statement, so concurrent logins cannot trip `sessions_principal_key`.
const UPSERT_SESSION: &str = r"
    INSERT INTO sessions (token_hash, principal_id, issued_at, expires_at)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (principal_id) DO UPDATE
    SET token_hash = EXCLUDED.token_hash,
        issued_at = EXCLUDED.issued_at,
        expires_at = EXCLUDED.expires_at
";

#[derive(sqlx::FromRow)]
struct SessionRow {
    token_hash: String,
    principal_id: PrincipalId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            token_hash: TokenHash::from_stored(row.token_hash),
            principal_id: row.principal_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(UPSERT_SESSION)
            .bind(session.token_hash.as_str())
            .bind(session.principal_id)
            .bind(session.issued_at)
            .bind(session.expires_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn find(&self, token_hash: &TokenHash) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"
            SELECT token_hash, principal_id, issued_at, expires_at
            FROM sessions
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Session::from))
    }

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash.as_str())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::UPSERT_SESSION;

    fn normalized(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_insert_replaces_on_principal_conflict() {
        let sql = normalized(UPSERT_SESSION);
        assert!(sql.contains("ON CONFLICT (principal_id) DO UPDATE"));
        for column in ["token_hash", "issued_at", "expires_at"] {
            assert!(sql.contains(&format!("{column} = EXCLUDED.{column}")));
        }
        assert!(!sql.contains("DELETE"));
    }
}
