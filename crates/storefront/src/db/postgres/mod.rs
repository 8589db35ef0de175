//! `PostgreSQL` store backend.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database. Each table has a `*Row` type that converts into
//! the domain model, failing with `RepositoryError::DataCorruption` if a
//! stored value no longer passes validation.

mod orders;
mod principals;
mod sessions;
mod verifications;

use sqlx::PgPool;

use super::RepositoryError;

/// `PostgreSQL` implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
