//! Session types.
//!
//! The bearer token is handed to the client once and never stored. Stores
//! key sessions by the SHA-256 digest of the token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use fashion_hub_core::PrincipalId;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// An opaque bearer token. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token presented by a client.
    #[must_use]
    pub fn from_client(raw: &str) -> Self {
        Self(raw.trim().to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The storage key for this token.
    #[must_use]
    pub fn hash(&self) -> TokenHash {
        TokenHash(hex::encode(Sha256::digest(self.0.as_bytes())))
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Hex SHA-256 of a [`SessionToken`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a digest read back from storage.
    #[must_use]
    pub const fn from_stored(hex: String) -> Self {
        Self(hex)
    }
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_hash: TokenHash,
    pub principal_id: PrincipalId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Expiry is strict: a session is still valid at exactly `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A freshly issued session together with the only copy of its token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: SessionToken,
    pub session: Session,
}

/// Outcome of validating a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Active(Session),
    /// The session existed but had expired. It has now been deleted.
    Expired,
    NotFound,
}
