//! Human-legible order codes.
//!
//! Format: `ORD-{year}-{timestamp}-{random}{check}` where `timestamp` is the
//! creation time in milliseconds encoded in base 36, `random` is six base-36
//! characters and `check` is a single base-36 checksum character over
//! everything before it. Example: `ORD-2026-MGS1R0K0-4ZP9QXH`.
//!
//! The random segment makes codes hard to guess, but a code is still only a
//! casual bearer credential for guest order lookup.

use core::fmt;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PREFIX: &str = "ORD";
const RANDOM_LEN: usize = 6;

/// Errors that can occur when parsing an [`OrderCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderCodeError {
    /// The code does not have the `ORD-YYYY-TTTT-RRRRRRC` shape.
    #[error("order code is malformed")]
    Malformed,
    /// The check character does not match.
    #[error("order code checksum mismatch")]
    Checksum,
}

/// A unique, checkable order code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderCode(String);

impl OrderCode {
    /// Generate a new code for an order created at `now`.
    pub fn generate<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let random: String = (0..RANDOM_LEN)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();

        let body = format!("{PREFIX}-{:04}-{}-{random}", now.year(), to_base36(millis));
        let check = checksum(&body);
        Self(format!("{body}{check}"))
    }

    /// Parse and validate a code supplied by a caller.
    ///
    /// Input is trimmed and upper-cased first, so codes read back over the
    /// phone or typed in lower case still resolve.
    ///
    /// # Errors
    ///
    /// Returns [`OrderCodeError::Malformed`] if the shape is wrong and
    /// [`OrderCodeError::Checksum`] if the check character does not match.
    pub fn parse(s: &str) -> Result<Self, OrderCodeError> {
        let s = s.trim().to_ascii_uppercase();

        let mut parts = s.split('-');
        let (Some(prefix), Some(year), Some(ts), Some(tail), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(OrderCodeError::Malformed);
        };

        if prefix != PREFIX
            || year.len() != 4
            || !year.bytes().all(|b| b.is_ascii_digit())
            || ts.is_empty()
            || ts.len() > 13
            || !ts.bytes().all(is_base36)
            || tail.len() != RANDOM_LEN + 1
            || !tail.bytes().all(is_base36)
        {
            return Err(OrderCodeError::Malformed);
        }

        let (body, check) = s.split_at(s.len() - 1);
        if check.chars().next() != Some(checksum(body)) {
            return Err(OrderCodeError::Checksum);
        }

        Ok(Self(s))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_base36(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_uppercase()
}

fn digit_value(b: u8) -> u32 {
    match b {
        b'0'..=b'9' => u32::from(b - b'0'),
        b'A'..=b'Z' => u32::from(b - b'A') + 10,
        _ => 0,
    }
}

/// Position-weighted sum of base-36 digit values, hyphens skipped.
fn checksum(body: &str) -> char {
    let sum = body
        .bytes()
        .filter(|b| *b != b'-')
        .zip(1u32..)
        .fold(0u32, |acc, (b, weight)| {
            (acc + digit_value(b) * weight) % 36
        });
    char::from(ALPHABET[sum as usize])
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderCode {
    type Err = OrderCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderCode {
    type Error = OrderCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderCode> for String {
    fn from(code: OrderCode) -> Self {
        code.0
    }
}

impl AsRef<str> for OrderCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
