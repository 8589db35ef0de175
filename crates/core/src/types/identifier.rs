//! Login identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Identifier`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The input is empty after trimming.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input is shorter than the minimum.
    #[error("identifier must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("identifier cannot contain whitespace or control characters")]
    InvalidCharacter,
}

/// A case-normalized login identifier (an email or an admin username).
///
/// Two identifiers that differ only in case or surrounding whitespace are the
/// same identifier. Rate limiting is keyed on this type, so unregistered
/// identifiers are throttled exactly like registered ones.
///
/// ```
/// use fashion_hub_core::Identifier;
///
/// let a = Identifier::parse(" Bob ").unwrap();
/// let b = Identifier::parse("bob").unwrap();
/// assert_eq!(a, b);
/// assert!(Identifier::parse("b o b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Minimum length of an identifier.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of an identifier.
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an identifier.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] if the trimmed input is empty, outside
    /// the length bounds, or contains whitespace.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let len = s.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(IdentifierError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(IdentifierError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdentifierError::InvalidCharacter);
        }

        Ok(Self(s.to_lowercase()))
    }

    /// Wrap a value that has already been normalized (e.g. a parsed [`Email`](super::Email)).
    pub(crate) const fn from_normalized(s: String) -> Self {
        Self(s)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
