//! Unit price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount exceeds the per-unit ceiling.
    #[error("price cannot exceed {max}")]
    TooLarge {
        /// Maximum allowed unit price.
        max: Decimal,
    },
}

/// A non-negative unit price in rupees.
///
/// Serialized as a decimal string (`"1299.00"`) so no precision is lost
/// through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Largest accepted unit price.
    pub const MAX: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    /// Validate and wrap an amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the amount is negative or above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    /// The wrapped amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `self * quantity`, the total for one order line.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}
