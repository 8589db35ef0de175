//! Persistence for principals, sessions, orders, and payment verifications.
//!
//! Services only see the four store traits below. Two backends implement
//! them:
//!
//! - [`MemoryStore`] - process-local maps, used by tests and when no database
//!   URL is configured
//! - [`PgStore`] - `PostgreSQL` via sqlx
//!
//! Every write that gates a state transition is conditional on the state the
//! caller observed (compare-and-set), so two concurrent deciders cannot both
//! win.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p fashion-hub-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use fashion_hub_core::{
    Identifier, OrderCode, OrderStatus, PrincipalId, Role, VerificationId, VerificationStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    Order, PaymentMark, PaymentVerification, Principal, Session, StatusUpdate, TokenHash,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique identifier).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store did not answer within the deadline.
    #[error("store call `{0}` timed out")]
    Timeout(&'static str),
}

/// Principal records and password digests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, RepositoryError>;

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepositoryError>;

    /// Returns `RepositoryError::Conflict` if the identifier is taken.
    async fn insert(&self, principal: &Principal) -> Result<(), RepositoryError>;

    /// Set `role` to `new` only if it is still `expected`.
    ///
    /// Returns the updated principal, or `None` if the role had changed (or
    /// the principal is gone).
    async fn compare_and_set_role(
        &self,
        id: PrincipalId,
        expected: Role,
        new: Role,
        decided_by: PrincipalId,
        decided_at: DateTime<Utc>,
    ) -> Result<Option<Principal>, RepositoryError>;

    /// Promote a principal to main admin. Idempotent for the current main.
    ///
    /// Returns `RepositoryError::Conflict` if a different main admin exists
    /// and `RepositoryError::NotFound` if the principal does not.
    async fn set_main(&self, id: PrincipalId) -> Result<Principal, RepositoryError>;

    async fn find_main(&self) -> Result<Option<Principal>, RepositoryError>;

    /// Principals whose role is in `roles`, oldest first.
    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<Principal>, RepositoryError>;
}

/// Issued sessions, keyed by token digest.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session, dropping any earlier session of the same principal.
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError>;

    async fn find(&self, token_hash: &TokenHash) -> Result<Option<Session>, RepositoryError>;

    /// Returns whether a session was removed.
    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepositoryError>;
}

/// Orders, keyed by order code.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns `RepositoryError::Conflict` if the code is taken.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError>;

    /// All orders, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Orders owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Order>, RepositoryError>;

    /// Apply `update` only if the order's status is still `expected`.
    ///
    /// Returns `None` if the status had changed or the order is gone.
    async fn update_status(
        &self,
        code: &OrderCode,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Mark an order paid only if its payment is still pending.
    async fn mark_paid(
        &self,
        code: &OrderCode,
        payment_id: &str,
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> Result<PaymentMark, RepositoryError>;
}

/// Payment verification requests.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert(&self, verification: &PaymentVerification) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        id: VerificationId,
    ) -> Result<Option<PaymentVerification>, RepositoryError>;

    /// Pending requests, oldest first.
    async fn list_pending(&self) -> Result<Vec<PaymentVerification>, RepositoryError>;

    /// Record the terminal status only if the request is still pending.
    ///
    /// Returns `None` if it had already been decided or does not exist.
    async fn decide(
        &self,
        id: VerificationId,
        status: VerificationStatus,
        decided_by: PrincipalId,
        decided_at: DateTime<Utc>,
    ) -> Result<Option<PaymentVerification>, RepositoryError>;
}

/// The set of stores a running storefront uses.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub orders: Arc<dyn OrderStore>,
    pub verifications: Arc<dyn VerificationStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// All four stores backed by one fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            credentials: store.clone(),
            sessions: store.clone(),
            orders: store.clone(),
            verifications: store,
            pool: None,
        }
    }

    /// All four stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            credentials: store.clone(),
            sessions: store.clone(),
            orders: store.clone(),
            verifications: store,
            pool: Some(pool),
        }
    }

    /// Swap the order store, keeping the rest.
    #[must_use]
    pub fn with_orders(mut self, orders: Arc<dyn OrderStore>) -> Self {
        self.orders = orders;
        self
    }

    /// The database pool, when running on `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
