//! Principal queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fashion_hub_core::{Email, Identifier, PasswordDigest, PrincipalId, Role};

use super::{PgStore, conflict_on_unique};
use crate::db::{CredentialStore, RepositoryError};
use crate::models::Principal;

const PRINCIPAL_COLUMNS: &str = "id, identifier, display_name, contact_address, password_digest, \
     role, created_at, decided_by, decided_at";

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    id: PrincipalId,
    identifier: String,
    display_name: String,
    contact_address: Option<String>,
    password_digest: String,
    role: Role,
    created_at: DateTime<Utc>,
    decided_by: Option<PrincipalId>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<PrincipalRow> for Principal {
    type Error = RepositoryError;

    fn try_from(row: PrincipalRow) -> Result<Self, Self::Error> {
        let identifier = Identifier::parse(&row.identifier).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid identifier in database: {e}"))
        })?;
        let contact_address = row
            .contact_address
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid contact address in database: {e}"))
            })?;

        Ok(Self {
            id: row.id,
            identifier,
            display_name: row.display_name,
            contact_address,
            password: PasswordDigest::new(row.password_digest),
            role: row.role,
            created_at: row.created_at,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
        })
    }
}

fn into_principal(row: Option<PrincipalRow>) -> Result<Option<Principal>, RepositoryError> {
    row.map(Principal::try_from).transpose()
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE identifier = $1"
        ))
        .bind(identifier.as_str())
        .fetch_optional(self.pool())
        .await?;

        into_principal(row)
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        into_principal(row)
    }

    async fn insert(&self, principal: &Principal) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO principals
                (id, identifier, display_name, contact_address, password_digest, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(principal.id)
        .bind(principal.identifier.as_str())
        .bind(&principal.display_name)
        .bind(principal.contact_address.as_ref().map(Email::as_str))
        .bind(principal.password.as_str())
        .bind(principal.role)
        .bind(principal.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "principal"))?;

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
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            r"
            UPDATE principals
            SET role = $3, decided_by = $4, decided_at = $5
            WHERE id = $1 AND role = $2
            RETURNING {PRINCIPAL_COLUMNS}
            "
        ))
        .bind(id)
        .bind(expected)
        .bind(new)
        .bind(decided_by)
        .bind(decided_at)
        .fetch_optional(self.pool())
        .await?;

        into_principal(row)
    }

    async fn set_main(&self, id: PrincipalId) -> Result<Principal, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let other_main: Option<PrincipalId> = sqlx::query_scalar(
            "SELECT id FROM principals WHERE role = 'main_admin' AND id <> $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if other_main.is_some() {
            return Err(RepositoryError::Conflict(
                "a different main admin exists".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "UPDATE principals SET role = 'main_admin' WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "main admin"))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Principal::try_from(row)
    }

    async fn find_main(&self) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE role = 'main_admin'"
        ))
        .fetch_optional(self.pool())
        .await?;

        into_principal(row)
    }

    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<Principal>, RepositoryError> {
        let roles: Vec<String> = roles.iter().map(ToString::to_string).collect();
        let rows = sqlx::query_as::<_, PrincipalRow>(&format!(
            r"
            SELECT {PRINCIPAL_COLUMNS} FROM principals
            WHERE role::text = ANY($1)
            ORDER BY created_at, identifier
            "
        ))
        .bind(roles)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Principal::try_from).collect()
    }
}
