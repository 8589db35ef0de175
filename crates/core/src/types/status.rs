//! Role and lifecycle status enums.

use serde::{Deserialize, Serialize};

/// What a principal is allowed to be.
///
/// A closed set of variants so that illegal combinations (a pending main
/// admin, a customer with an approval status) cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "principal_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper. Authorized only for their own data.
    Customer,
    /// An admin request awaiting the main admin's decision.
    PendingAdmin,
    /// An admin whose request was approved.
    ApprovedAdmin,
    /// An admin whose request was rejected or whose access was revoked.
    RejectedAdmin,
    /// The single privileged admin. Always approved.
    MainAdmin,
}

impl Role {
    /// Any admin variant, whatever its approval state.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        !matches!(self, Self::Customer)
    }

    /// Admin capabilities are live (approved or main).
    #[must_use]
    pub const fn is_approved_admin(self) -> bool {
        matches!(self, Self::ApprovedAdmin | Self::MainAdmin)
    }

    #[must_use]
    pub const fn is_main(self) -> bool {
        matches!(self, Self::MainAdmin)
    }

    /// The role an admin ends up in after `decision`.
    #[must_use]
    pub const fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::Approved => Self::ApprovedAdmin,
            Decision::Rejected => Self::RejectedAdmin,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::PendingAdmin => write!(f, "pending_admin"),
            Self::ApprovedAdmin => write!(f, "approved_admin"),
            Self::RejectedAdmin => write!(f, "rejected_admin"),
            Self::MainAdmin => write!(f, "main_admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "pending_admin" => Ok(Self::PendingAdmin),
            "approved_admin" => Ok(Self::ApprovedAdmin),
            "rejected_admin" => Ok(Self::RejectedAdmin),
            "main_admin" => Ok(Self::MainAdmin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// The main admin's verdict on an admin request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

/// Order fulfillment status.
///
/// Serialized with the labels shown to shoppers on the tracking page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "Shipped")]
    Shipped,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// `Delivered` and `Cancelled` never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an order in this status may move to `next`.
    ///
    /// Re-applying the current non-terminal status is allowed (a tracking
    /// location update). Nothing returns to `OrderPlaced`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self == next || next != Self::OrderPlaced
    }

    /// The shopper-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an order has been paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// Lifecycle of a payment verification request. Decided exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "verification_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_predicates() {
        assert!(!Role::Customer.is_admin());
        assert!(Role::PendingAdmin.is_admin());
        assert!(!Role::PendingAdmin.is_approved_admin());
        assert!(!Role::RejectedAdmin.is_approved_admin());
        assert!(Role::ApprovedAdmin.is_approved_admin());
        assert!(Role::MainAdmin.is_approved_admin());
        assert!(Role::MainAdmin.is_main());
        assert!(!Role::ApprovedAdmin.is_main());
    }

    #[test]
    fn test_role_display_parse_roundtrip() {
        for role in [
            Role::Customer,
            Role::PendingAdmin,
            Role::ApprovedAdmin,
            Role::RejectedAdmin,
            Role::MainAdmin,
        ] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_from_decision() {
        assert_eq!(Role::from_decision(Decision::Approved), Role::ApprovedAdmin);
        assert_eq!(Role::from_decision(Decision::Rejected), Role::RejectedAdmin);
    }

    #[test]
    fn test_order_status_uses_display_labels() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        let parsed: OrderStatus = serde_json::from_str("\"Order Placed\"").unwrap();
        assert_eq!(parsed, OrderStatus::OrderPlaced);
    }

    #[test]
    fn test_terminal_statuses_are_frozen() {
        for next in [OrderStatus::Processing, OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(!OrderStatus::Delivered.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_nothing_returns_to_order_placed() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::OrderPlaced));
        assert!(OrderStatus::OrderPlaced.can_transition_to(OrderStatus::OrderPlaced));
    }

    #[test]
    fn test_non_terminal_moves_freely() {
        assert!(OrderStatus::OrderPlaced.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_decision_serde() {
        let parsed: Decision = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, Decision::Rejected);
    }
}
