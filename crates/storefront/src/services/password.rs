//! Password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use fashion_hub_core::PasswordDigest;

use super::error::{ServiceError, ValidationError};

/// Hashes and verifies secrets. Cheap to clone.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher {
    /// A hasher with explicit Argon2id cost parameters.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Minimum-cost parameters. Only for tests.
    #[must_use]
    pub fn insecure_fast() -> Self {
        Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
            .map(Self::with_params)
            .unwrap_or_default()
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UpstreamUnavailable` if hashing fails, which
    /// only happens on misconfigured parameters.
    pub fn hash(&self, secret: &str) -> Result<PasswordDigest, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| PasswordDigest::new(hash.to_string()))
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                ServiceError::UpstreamUnavailable
            })
    }

    /// Check a secret against a stored digest. An unparseable digest never matches.
    #[must_use]
    pub fn verify(&self, secret: &str, digest: &PasswordDigest) -> bool {
        PasswordHash::new(digest.as_str())
            .is_ok_and(|parsed| self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok())
    }

    /// Fail a check for an account that does not exist.
    ///
    /// Runs one hash with this hasher's parameters, the same work [`Self::verify`]
    /// does against a digest this hasher produced, so the response time does
    /// not reveal whether the identifier is registered.
    #[must_use]
    pub fn verify_absent(&self, secret: &str) -> bool {
        let salt = SaltString::generate(&mut OsRng);
        let _ = self.argon2.hash_password(secret.as_bytes(), &salt);
        false
    }
}

/// Enforce the minimum password length.
///
/// # Errors
///
/// Returns `ValidationError::WeakPassword` if `secret` is shorter than `min`.
pub fn validate_password(secret: &str, min: usize) -> Result<(), ValidationError> {
    if secret.chars().count() < min {
        return Err(ValidationError::WeakPassword { min });
    }
    Ok(())
}
