//! Checkout, tracking, and fulfillment status.
//!
//! Totals are always computed from the validated items; a client-supplied
//! total is never read. Guest orders have no owner and are tracked by their
//! code alone, so the order code acts as a bearer credential for them.

use std::sync::Arc;

use rust_decimal::Decimal;

use fashion_hub_core::{OrderCode, OrderStatus, PaymentStatus, Price, PrincipalId, sanitize_text};

use super::{Authorizer, OrderFeed, ServiceError, ServiceResult, StoreDeadline, ValidationError};
use crate::clock::Clock;
use crate::db::{OrderStore, RepositoryError};
use crate::models::order::DEFAULT_PAYMENT_METHOD;
use crate::models::{
    CustomerSnapshot, NewOrder, NewOrderItem, Order, OrderEventKind, OrderItem, Principal,
    StatusUpdate,
};

/// Upper bound on lines per order.
pub const MAX_ITEMS: usize = 100;

/// Upper bound on the quantity of a single line.
pub const MAX_QUANTITY: u32 = 1000;

/// Fresh codes tried before giving up on a collision streak.
const CODE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    authz: Authorizer,
    feed: OrderFeed,
    clock: Arc<dyn Clock>,
    deadline: StoreDeadline,
}

impl OrderService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        authz: Authorizer,
        feed: OrderFeed,
        clock: Arc<dyn Clock>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            orders,
            authz,
            feed,
            clock,
            deadline,
        }
    }

    /// Place an order as a guest (`caller = None`) or signed-in principal.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty cart, missing branch, bad lines, or a
    ///   guest checkout without name and contact
    /// - `Unauthenticated` if `caller` no longer exists
    pub async fn create(&self, payload: NewOrder, caller: Option<PrincipalId>) -> ServiceResult<Order> {
        let owner = match caller {
            Some(id) => Some(self.authz.load(id).await?),
            None => None,
        };

        if payload.items.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        if payload.items.len() > MAX_ITEMS {
            return Err(ValidationError::TooManyItems { max: MAX_ITEMS }.into());
        }
        let branch = payload
            .branch
            .as_deref()
            .map(sanitize_text)
            .filter(|b| !b.is_empty())
            .ok_or(ValidationError::MissingBranch)?;

        let items = payload
            .items
            .iter()
            .map(validate_item)
            .collect::<Result<Vec<_>, _>>()?;
        let total: Decimal = items.iter().map(OrderItem::line_total).sum();
        let customer = customer_snapshot(&payload, owner.as_ref())?;
        let payment_method = payload
            .payment_method
            .as_deref()
            .map(sanitize_text)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned());

        let now = self.clock.now();
        let mut order = Order {
            code: OrderCode::generate(now, &mut rand::rng()),
            owner: owner.map(|p| p.id),
            items,
            total,
            status: OrderStatus::OrderPlaced,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_method,
            branch,
            location: None,
            customer,
            created_at: now,
            updated_at: now,
            updated_by: None,
        };

        let mut attempt = 1;
        loop {
            match self
                .deadline
                .run("orders.insert", self.orders.insert(&order))
                .await
            {
                Ok(()) => break,
                Err(RepositoryError::Conflict(_)) if attempt < CODE_ATTEMPTS => {
                    tracing::warn!(code = %order.code, attempt, "order code collision, regenerating");
                    order.code = OrderCode::generate(now, &mut rand::rng());
                    attempt += 1;
                }
                Err(RepositoryError::Conflict(_)) => {
                    return Err(ServiceError::Conflict("could not allocate an order code"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            code = %order.code,
            owner = ?order.owner,
            total = %order.total,
            lines = order.items.len(),
            "order placed"
        );
        self.feed.publish(OrderEventKind::Created, &order);
        Ok(order)
    }

    /// Look up an order by code.
    ///
    /// Anonymous lookups succeed for any existing code. A signed-in caller
    /// must own the order or be an approved admin.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed code
    /// - `NotFound` if no order has the code
    /// - `PermissionDenied` for a signed-in caller without access
    pub async fn track(&self, code: &str, caller: Option<PrincipalId>) -> ServiceResult<Order> {
        let code = OrderCode::parse(code).map_err(ValidationError::from)?;
        let order = self.find(&code).await?;

        if let Some(caller) = caller {
            let principal = self.authz.load(caller).await?;
            if order.owner != Some(principal.id) && !principal.role.is_approved_admin() {
                tracing::warn!(code = %order.code, principal_id = %caller, "order lookup denied");
                return Err(ServiceError::PermissionDenied);
            }
        }
        Ok(order)
    }

    /// Move an order to `status`. Approved admins only.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` unless the caller is an approved admin
    /// - `NotFound` if the order does not exist
    /// - `InvalidTransition` out of a terminal status or back to placed
    /// - `Conflict` if the status changed underneath the caller
    pub async fn update_status(
        &self,
        code: &str,
        status: OrderStatus,
        location: Option<&str>,
        caller: PrincipalId,
    ) -> ServiceResult<Order> {
        let admin = self.authz.require_approved_admin(caller).await?;
        let code = OrderCode::parse(code).map_err(ValidationError::from)?;
        let current = self.find(&code).await?;

        if !current.status.can_transition_to(status) {
            return Err(ServiceError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let update = StatusUpdate {
            status,
            location: location.map(sanitize_text).filter(|l| !l.is_empty()),
            updated_by: admin.id,
            updated_at: self.clock.now(),
        };
        let updated = self
            .deadline
            .run(
                "orders.update_status",
                self.orders.update_status(&code, current.status, &update),
            )
            .await?
            .ok_or(ServiceError::Conflict("order status changed concurrently"))?;

        tracing::info!(
            code = %updated.code,
            from = %current.status,
            to = %updated.status,
            updated_by = %admin.id,
            "order status updated"
        );
        self.feed.publish(OrderEventKind::StatusChanged, &updated);
        Ok(updated)
    }

    /// Every order, newest first. Approved admins only.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller is an approved admin.
    pub async fn list_all(&self, caller: PrincipalId) -> ServiceResult<Vec<Order>> {
        self.authz.require_approved_admin(caller).await?;
        Ok(self
            .deadline
            .run("orders.list_all", self.orders.list_all())
            .await?)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the caller no longer exists.
    pub async fn list_mine(&self, caller: PrincipalId) -> ServiceResult<Vec<Order>> {
        let principal = self.authz.load(caller).await?;
        Ok(self
            .deadline
            .run(
                "orders.list_by_owner",
                self.orders.list_by_owner(principal.id),
            )
            .await?)
    }

    async fn find(&self, code: &OrderCode) -> ServiceResult<Order> {
        self.deadline
            .run("orders.find", self.orders.find(code))
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }
}

fn validate_item(item: &NewOrderItem) -> Result<OrderItem, ValidationError> {
    let sku = sanitize_text(&item.sku);
    if sku.is_empty() {
        return Err(ValidationError::MissingField("sku"));
    }
    let name = sanitize_text(&item.name);
    if name.is_empty() {
        return Err(ValidationError::MissingField("item name"));
    }
    if item.quantity == 0 || item.quantity > MAX_QUANTITY {
        return Err(ValidationError::InvalidQuantity {
            sku,
            max: MAX_QUANTITY,
        });
    }
    let unit_price = match Price::new(item.unit_price) {
        Ok(price) => price,
        Err(source) => return Err(ValidationError::InvalidPrice { sku, source }),
    };

    Ok(OrderItem {
        sku,
        name,
        unit_price,
        quantity: item.quantity,
        size: optional_text(item.size.as_deref()),
        color: optional_text(item.color.as_deref()),
    })
}

/// Build the customer snapshot, defaulting from the signed-in principal.
fn customer_snapshot(
    payload: &NewOrder,
    owner: Option<&Principal>,
) -> Result<CustomerSnapshot, ValidationError> {
    let name = optional_text(payload.customer_name.as_deref())
        .or_else(|| owner.map(|p| p.display_name.clone()))
        .ok_or(ValidationError::MissingField("customer name"))?;
    let contact = optional_text(payload.customer_contact.as_deref())
        .or_else(|| {
            owner.map(|p| {
                p.contact_address
                    .as_ref()
                    .map_or_else(|| p.identifier.to_string(), ToString::to_string)
            })
        })
        .ok_or(ValidationError::MissingField("customer contact"))?;

    Ok(CustomerSnapshot {
        name,
        contact,
        address: optional_text(payload.customer_address.as_deref()),
    })
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(sanitize_text).filter(|v| !v.is_empty())
}
