//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional. With no database URL the storefront runs on
//! the in-memory backend, which is what the test suites use.
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Security policy
//! - `SESSION_TTL_MS` - Session lifetime (default: 3600000, one hour)
//! - `LOGIN_WINDOW_MS` - Failed-login lookback window (default: 900000, 15 minutes)
//! - `LOGIN_MAX_FAILURES` - Failures inside the window before blocking (default: 3)
//! - `OTP_LENGTH` - Digits in a one-time code (default: 6)
//! - `OTP_VALIDITY_MS` - One-time code lifetime (default: 60000)
//! - `STORE_TIMEOUT_MS` - Deadline for a single store call (default: 5000)
//! - `PASSWORD_MIN_LENGTH` - Minimum password length (default: 8)
//! - `AUTH_THROTTLE_BURST` - Per-IP burst on auth routes (default: 5)
//! - `AUTH_THROTTLE_REPLENISH_SECS` - Seconds per replenished auth request (default: 6)
//!
//! ## Main admin bootstrap
//! - `MAIN_ADMIN_IDENTIFIER` - Identifier of the main admin
//! - `MAIN_ADMIN_PASSWORD` - Password (min 12 chars, high entropy, no placeholders)
//! - `MAIN_ADMIN_NAME` - Display name (default: "Main Admin")
//!
//! ## Observability
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//! - `LOG_FORMAT` - `pretty` (default) or `json`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use fashion_hub_core::Identifier;

const MIN_BOOTSTRAP_PASSWORD_LENGTH: usize = 12;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "admin123",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` connection URL; `None` selects the in-memory backend
    pub database_url: Option<SecretString>,
    /// Session, throttling, and one-time code policy
    pub security: SecurityConfig,
    /// Main admin to ensure at startup
    pub main_admin: Option<MainAdminBootstrap>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
    pub log_format: LogFormat,
}

/// Read-only policy values consumed by the services.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub session_ttl: Duration,
    pub login_window: Duration,
    pub login_max_failures: u32,
    pub otp_length: u32,
    pub otp_validity: Duration,
    pub store_timeout: Duration,
    pub password_min_length: usize,
    pub auth_throttle_burst: u32,
    pub auth_throttle_replenish: Duration,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60 * 60),
            login_window: Duration::from_secs(15 * 60),
            login_max_failures: 3,
            otp_length: 6,
            otp_validity: Duration::from_secs(60),
            store_timeout: Duration::from_secs(5),
            password_min_length: 8,
            auth_throttle_burst: 5,
            auth_throttle_replenish: Duration::from_secs(6),
        }
    }
}

/// Credentials for the main admin, taken from the environment.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct MainAdminBootstrap {
    pub identifier: Identifier,
    pub display_name: String,
    pub password: SecretString,
}

impl std::fmt::Debug for MainAdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainAdminBootstrap")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Configuration with every default and no database, main admin, or Sentry.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            database_url: None,
            security: SecurityConfig::default(),
            main_admin: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            log_format: LogFormat::Pretty,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, a policy value is out
    /// of range, or the main admin password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default("STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = get_parsed_or_default("STOREFRONT_PORT", 3000_u16)?;
        let database_url = get_database_url("STOREFRONT_DATABASE_URL");

        let security = SecurityConfig::from_env()?;
        let main_admin = MainAdminBootstrap::from_env()?;

        Ok(Self {
            host,
            port,
            database_url,
            security,
            main_admin,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
            log_format: get_parsed_or_default("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            session_ttl: get_millis_or_default("SESSION_TTL_MS", defaults.session_ttl)?,
            login_window: get_millis_or_default("LOGIN_WINDOW_MS", defaults.login_window)?,
            login_max_failures: get_parsed_or_default(
                "LOGIN_MAX_FAILURES",
                defaults.login_max_failures,
            )?,
            otp_length: get_parsed_or_default("OTP_LENGTH", defaults.otp_length)?,
            otp_validity: get_millis_or_default("OTP_VALIDITY_MS", defaults.otp_validity)?,
            store_timeout: get_millis_or_default("STORE_TIMEOUT_MS", defaults.store_timeout)?,
            password_min_length: get_parsed_or_default(
                "PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            )?,
            auth_throttle_burst: get_parsed_or_default(
                "AUTH_THROTTLE_BURST",
                defaults.auth_throttle_burst,
            )?,
            auth_throttle_replenish: Duration::from_secs(get_parsed_or_default(
                "AUTH_THROTTLE_REPLENISH_SECS",
                defaults.auth_throttle_replenish.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every policy value is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the first offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("SESSION_TTL_MS", !self.session_ttl.is_zero(), "must be positive"),
            ("LOGIN_WINDOW_MS", !self.login_window.is_zero(), "must be positive"),
            ("LOGIN_MAX_FAILURES", self.login_max_failures >= 1, "must be at least 1"),
            ("OTP_LENGTH", (4..=10).contains(&self.otp_length), "must be between 4 and 10"),
            ("OTP_VALIDITY_MS", !self.otp_validity.is_zero(), "must be positive"),
            ("STORE_TIMEOUT_MS", !self.store_timeout.is_zero(), "must be positive"),
            ("PASSWORD_MIN_LENGTH", self.password_min_length >= 1, "must be at least 1"),
            ("AUTH_THROTTLE_BURST", self.auth_throttle_burst >= 1, "must be at least 1"),
            (
                "AUTH_THROTTLE_REPLENISH_SECS",
                !self.auth_throttle_replenish.is_zero(),
                "must be positive",
            ),
        ];

        match checks.iter().find(|(_, ok, _)| !ok) {
            Some((key, _, reason)) => Err(ConfigError::InvalidEnvVar(
                (*key).to_string(),
                (*reason).to_string(),
            )),
            None => Ok(()),
        }
    }
}

impl MainAdminBootstrap {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw_identifier) = get_optional_env("MAIN_ADMIN_IDENTIFIER") else {
            return Ok(None);
        };

        let identifier = Identifier::parse(&raw_identifier).map_err(|e| {
            ConfigError::InvalidEnvVar("MAIN_ADMIN_IDENTIFIER".to_string(), e.to_string())
        })?;
        let password = get_required_env("MAIN_ADMIN_PASSWORD").map(SecretString::from)?;
        validate_bootstrap_password(&password, "MAIN_ADMIN_PASSWORD")?;

        Ok(Some(Self {
            identifier,
            display_name: get_env_or_default("MAIN_ADMIN_NAME", "Main Admin"),
            password,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a millisecond duration, falling back to `default` when unset.
fn get_millis_or_default(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    get_parsed_or_default(key, default_ms).map(Duration::from_millis)
}

/// Validate the bootstrap password for length, placeholders, and entropy.
fn validate_bootstrap_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.chars().count() < MIN_BOOTSTRAP_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_BOOTSTRAP_PASSWORD_LENGTH} characters"),
        ));
    }
    validate_secret_strength(value, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a generated password."
            ),
        ));
    }

    Ok(())
}
