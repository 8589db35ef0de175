//! Main admin management commands.
//!
//! # Usage
//!
//! ```bash
//! MAIN_ADMIN_PASSWORD='...' fh-cli admin bootstrap -i owner@fashionhub.in -n "Store Owner"
//! fh-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `MAIN_ADMIN_PASSWORD` - password for `bootstrap`; never taken as an argument

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use fashion_hub_storefront::config::StorefrontConfig;
use fashion_hub_storefront::db::{self, RepositoryError, Stores};
use fashion_hub_storefront::services::admin_approval::ADMIN_ROLES;
use fashion_hub_storefront::services::{BootstrapOutcome, ServiceError};
use fashion_hub_storefront::state::AppState;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// The service refused the bootstrap (weak password, another main admin, ...).
    #[error("{0}")]
    Service(#[from] ServiceError),
}

async fn connect() -> Result<Stores, AdminError> {
    let database_url = super::database_url().ok_or(AdminError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;
    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(Stores::postgres(pool))
}

/// Create the main admin, or promote the existing account with that identifier.
///
/// Running it again with the same identifier is a no-op.
pub async fn bootstrap(identifier: &str, name: &str) -> Result<(), AdminError> {
    let password = std::env::var("MAIN_ADMIN_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("MAIN_ADMIN_PASSWORD"))?;

    let stores = connect().await?;
    let state = AppState::new(StorefrontConfig::with_defaults(), stores);

    let outcome = state
        .admin()
        .bootstrap_main(identifier, Some(name), password.expose_secret())
        .await?;

    match outcome {
        BootstrapOutcome::Created(p) => tracing::info!("Created main admin {} ({})", p.identifier, p.id),
        BootstrapOutcome::Promoted(p) => {
            tracing::info!("Promoted {} ({}) to main admin", p.identifier, p.id);
        }
        BootstrapOutcome::AlreadyPresent(p) => {
            tracing::info!("{} is already the main admin", p.identifier);
        }
    }
    Ok(())
}

/// Print every admin account, oldest first.
pub async fn list() -> Result<(), AdminError> {
    let stores = connect().await?;
    let admins = stores.credentials.list_by_roles(&ADMIN_ROLES).await?;

    #[allow(clippy::print_stdout)]
    {
        if admins.is_empty() {
            println!("No admin accounts.");
        }
        for admin in admins {
            println!(
                "{:<36}  {:<14}  {}  ({})",
                admin.id,
                admin.role.to_string(),
                admin.identifier,
                admin.display_name
            );
        }
    }
    Ok(())
}
