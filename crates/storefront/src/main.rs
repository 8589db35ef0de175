//! Fashion Hub storefront - order and admin API.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, bearer session tokens
//! - `PostgreSQL` when `DATABASE_URL` is set, otherwise an in-process store
//! - Main admin bootstrapped from `MAIN_ADMIN_*` on every start (idempotent)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fashion_hub_storefront::config::{LogFormat, StorefrontConfig};
use fashion_hub_storefront::db::{self, Stores};
use fashion_hub_storefront::routes;
use fashion_hub_storefront::services::BootstrapOutcome;
use fashion_hub_storefront::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Initialize tracing with `EnvFilter`, the chosen output format, and Sentry.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fashion_hub_storefront=info,tower_http=debug".into());
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(sentry_tracing::layer().event_filter(sentry_event_filter))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(sentry_tracing::layer().event_filter(sentry_event_filter))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let stores = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            // NOTE: Migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p fashion-hub-cli -- migrate
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Stores::in_memory()
        }
    };

    let state = AppState::new(config.clone(), stores);

    if let Some(main_admin) = &config.main_admin {
        let outcome = state
            .admin()
            .bootstrap_main(
                main_admin.identifier.as_str(),
                Some(main_admin.display_name.as_str()),
                main_admin.password.expose_secret(),
            )
            .await
            .expect("Failed to bootstrap main admin");
        match outcome {
            BootstrapOutcome::Created(p) => tracing::info!(principal_id = %p.id, "main admin created"),
            BootstrapOutcome::Promoted(p) => tracing::info!(principal_id = %p.id, "main admin promoted"),
            BootstrapOutcome::AlreadyPresent(p) => {
                tracing::debug!(principal_id = %p.id, "main admin already present");
            }
        }
    }

    let app = routes::app(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
