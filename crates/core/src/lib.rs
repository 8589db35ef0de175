//! Fashion Hub Core - Shared domain types.
//!
//! This crate provides the types used across all Fashion Hub components:
//! - `storefront` - Ordering, admin approval, and payment confirmation service
//! - `cli` - Command-line tools for migrations and main-admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything that can be checked without a store
//! (identifier normalization, order-code checksums, role predicates, price
//! arithmetic) lives here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, identifiers, prices, order codes, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
