//! Application state shared across handlers.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::{
    AdminApprovalService, AuthService, Authorizer, CodeSender, LogCodeSender, LoginRateLimiter,
    OrderFeed, OrderService, OtpService, PasswordHasher, PaymentService, SessionManager,
    StoreDeadline,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Every service is wired once
/// here against the same stores, clock, and rate limiter.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    authz: Authorizer,
    auth: AuthService,
    admin: AdminApprovalService,
    orders: OrderService,
    payments: PaymentService,
    otp: OtpService,
    feed: OrderFeed,
}

impl AppState {
    /// Create the production application state.
    ///
    /// Uses wall-clock time, default Argon2 parameters, and a code sender
    /// that only logs dispatch.
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: Stores) -> Self {
        Self::with_parts(
            config,
            stores,
            Arc::new(SystemClock),
            PasswordHasher::default(),
            Arc::new(LogCodeSender),
        )
    }

    /// Create application state from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        stores: Stores,
        clock: Arc<dyn Clock>,
        hasher: PasswordHasher,
        sender: Arc<dyn CodeSender>,
    ) -> Self {
        let security = &config.security;
        let deadline = StoreDeadline::new(security.store_timeout);
        let feed = OrderFeed::default();

        let sessions = SessionManager::new(
            stores.sessions.clone(),
            clock.clone(),
            security.session_ttl,
            deadline,
        );
        let limiter = LoginRateLimiter::new(
            security.login_window,
            security.login_max_failures,
            clock.clone(),
        );
        let authz = Authorizer::new(stores.credentials.clone(), sessions.clone(), deadline);

        let auth = AuthService::new(
            stores.credentials.clone(),
            hasher.clone(),
            limiter.clone(),
            sessions.clone(),
            clock.clone(),
            deadline,
            security.password_min_length,
        );
        let admin = AdminApprovalService::new(
            stores.credentials.clone(),
            authz.clone(),
            hasher,
            clock.clone(),
            deadline,
            security.password_min_length,
        );
        let orders = OrderService::new(
            stores.orders.clone(),
            authz.clone(),
            feed.clone(),
            clock.clone(),
            deadline,
        );
        let payments = PaymentService::new(
            stores.orders.clone(),
            stores.verifications.clone(),
            authz.clone(),
            feed.clone(),
            clock.clone(),
            deadline,
        );
        let otp = OtpService::new(
            stores.credentials.clone(),
            limiter,
            sessions,
            sender,
            clock,
            deadline,
            security.otp_length,
            security.otp_validity,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                authz,
                auth,
                admin,
                orders,
                payments,
                otp,
                feed,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The backing stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    #[must_use]
    pub fn authz(&self) -> &Authorizer {
        &self.inner.authz
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn admin(&self) -> &AdminApprovalService {
        &self.inner.admin
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    #[must_use]
    pub fn otp(&self) -> &OtpService {
        &self.inner.otp
    }

    /// The order change feed.
    #[must_use]
    pub fn feed(&self) -> &OrderFeed {
        &self.inner.feed
    }
}
