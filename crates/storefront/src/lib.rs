//! Fashion Hub storefront library.
//!
//! Admin approval, orders, payment verification, login throttling, and
//! bearer sessions behind a JSON API. The binary in `main.rs` and the
//! integration tests both build the application from here.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
