//! Domain models for storefront.
//!
//! These are validated domain objects. Row types for `PostgreSQL` live next to
//! the queries in `db::postgres` and convert into these.

pub mod order;
pub mod principal;
pub mod session;
pub mod verification;

pub use order::{
    CustomerSnapshot, NewOrder, NewOrderItem, Order, OrderEvent, OrderEventKind, OrderItem,
    PaymentMark, StatusUpdate,
};
pub use principal::{Principal, PrincipalView};
pub use session::{IssuedSession, Session, SessionLookup, SessionToken, TokenHash};
pub use verification::PaymentVerification;
