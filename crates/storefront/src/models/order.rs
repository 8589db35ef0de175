//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fashion_hub_core::{OrderCode, OrderStatus, PaymentStatus, Price, PrincipalId};

/// Payment method recorded when the checkout omits one.
pub const DEFAULT_PAYMENT_METHOD: &str = "COD";

/// One line of an order as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.line_total(self.quantity)
    }
}

/// Who the order is for, copied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A placed order.
///
/// `total` is computed once at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub code: OrderCode,
    /// `None` for guest checkout.
    pub owner: Option<PrincipalId>,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payment_method: String,
    pub branch: String,
    pub location: Option<String>,
    pub customer: CustomerSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<PrincipalId>,
}

/// Checkout payload as submitted by a client.
///
/// Any client-side total is ignored; only the items are trusted, after
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
    pub branch: Option<String>,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub customer_address: Option<String>,
}

/// A checkout line before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A conditional status write.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub location: Option<String>,
    pub updated_by: PrincipalId,
    pub updated_at: DateTime<Utc>,
}

/// Result of asking the store to mark an order paid.
#[derive(Debug, Clone)]
pub enum PaymentMark {
    Marked(Order),
    /// The order was already paid. Nothing was written.
    AlreadyPaid(Order),
    Missing,
}

/// What happened to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    StatusChanged,
    Paid,
}

impl OrderEventKind {
    /// Name used for the server-sent event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::Paid => "paid",
        }
    }
}

/// A snapshot published on every order mutation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order: Order,
}
