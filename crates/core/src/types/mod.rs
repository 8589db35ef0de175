//! Core types for Fashion Hub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;
pub mod identifier;
pub mod order_code;
pub mod price;
pub mod sanitize;
pub mod status;

pub use credential::PasswordDigest;
pub use email::{Email, EmailError};
pub use id::*;
pub use identifier::{Identifier, IdentifierError};
pub use order_code::{OrderCode, OrderCodeError};
pub use price::{Price, PriceError};
pub use sanitize::sanitize_text;
pub use status::*;
