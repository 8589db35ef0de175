//! Integration tests for Fashion Hub.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fashion-hub-integration-tests
//! ```
//!
//! Every test builds its own [`TestContext`] on the in-memory backend with a
//! manual clock, so tests are independent and need no database.
//!
//! # Test Categories
//!
//! - `admin_approval` - admin access requests and the main admin's decisions
//! - `orders_and_payments` - checkout, tracking, payment verification
//! - `http_api` - the full HTTP surface against a live local server

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;

use fashion_hub_core::{Identifier, PrincipalId};
use fashion_hub_storefront::clock::ManualClock;
use fashion_hub_storefront::config::StorefrontConfig;
use fashion_hub_storefront::db::Stores;
use fashion_hub_storefront::models::{NewOrder, NewOrderItem, Order, Principal};
use fashion_hub_storefront::services::{CodeSendError, CodeSender, PasswordHasher};
use fashion_hub_storefront::state::AppState;

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "runway-season-2024";

/// Identifier of the main admin created by [`TestContext::main_admin`].
pub const MAIN_ADMIN: &str = "owner@fashionhub.in";

/// Defaults, with the per-IP auth throttle opened wide so only tests that
/// target it ever trip it.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    let mut config = StorefrontConfig::with_defaults();
    config.port = 0;
    config.security.auth_throttle_burst = 1_000;
    config
}

/// Captures one-time codes instead of delivering them.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(Identifier, String)>>,
}

impl RecordingSender {
    /// The most recent code sent to `identifier`.
    pub fn last_code_for(&self, identifier: &str) -> Option<String> {
        let identifier = Identifier::parse(identifier).ok()?;
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(to, _)| *to == identifier)
            .map(|(_, code)| code.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl CodeSender for RecordingSender {
    async fn send(&self, principal: &Principal, code: &str) -> Result<(), CodeSendError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((principal.identifier.clone(), code.to_owned()));
        Ok(())
    }
}

/// A fully wired storefront over in-memory stores.
pub struct TestContext {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub sender: Arc<RecordingSender>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_stores(test_config(), Stores::in_memory())
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        Self::with_stores(config, Stores::in_memory())
    }

    #[must_use]
    pub fn with_stores(config: StorefrontConfig, stores: Stores) -> Self {
        let clock = Arc::new(ManualClock::default());
        let sender = Arc::new(RecordingSender::default());
        let state = AppState::with_parts(
            config,
            stores,
            clock.clone(),
            PasswordHasher::insecure_fast(),
            sender.clone(),
        );
        Self {
            state,
            clock,
            sender,
        }
    }

    /// Bootstrap the main admin ([`MAIN_ADMIN`] / [`PASSWORD`]).
    pub async fn main_admin(&self) -> Principal {
        self.state
            .admin()
            .bootstrap_main(MAIN_ADMIN, Some("Store Owner"), PASSWORD)
            .await
            .unwrap()
            .principal()
            .clone()
    }

    /// File an admin access request that stays pending.
    pub async fn pending_admin(&self, identifier: &str) -> Principal {
        self.state
            .admin()
            .request_access(identifier, None, PASSWORD)
            .await
            .unwrap()
    }

    /// An admin approved by `main`.
    pub async fn approved_admin(&self, main: PrincipalId, identifier: &str) -> Principal {
        let pending = self.pending_admin(identifier).await;
        self.state
            .admin()
            .decide(main, pending.id, fashion_hub_core::Decision::Approved)
            .await
            .unwrap()
    }

    /// A registered customer whose login identifier is `email`.
    pub async fn customer(&self, name: &str, email: &str) -> Principal {
        self.state
            .auth()
            .register_customer(name, email, PASSWORD)
            .await
            .unwrap()
    }

    /// Place a two-item order worth 1,498.00 for `owner` (or a guest).
    pub async fn place_order(&self, owner: Option<PrincipalId>) -> Order {
        self.state
            .orders()
            .create(sample_order(), owner)
            .await
            .unwrap()
    }
}

/// Checkout payload: one kurta at 999.00 and one dupatta at 499.00.
#[must_use]
pub fn sample_order() -> NewOrder {
    NewOrder {
        items: vec![
            NewOrderItem {
                sku: "KURTA-IND-M".to_owned(),
                name: "Indigo Kurta".to_owned(),
                unit_price: Decimal::new(99_900, 2),
                quantity: 1,
                size: Some("M".to_owned()),
                color: Some("Indigo".to_owned()),
            },
            NewOrderItem {
                sku: "DUP-SLK".to_owned(),
                name: "Silk Dupatta".to_owned(),
                unit_price: Decimal::new(49_900, 2),
                quantity: 1,
                size: None,
                color: None,
            },
        ],
        branch: Some("Koramangala".to_owned()),
        payment_method: Some("UPI".to_owned()),
        customer_name: Some("Guest Shopper".to_owned()),
        customer_contact: Some("+91 98450 00000".to_owned()),
        customer_address: Some("12 MG Road, Bengaluru".to_owned()),
    }
}

/// Serve the app on an ephemeral local port and return its base URL.
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = fashion_hub_storefront::routes::app(state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}
