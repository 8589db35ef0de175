//! Order queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use fashion_hub_core::{OrderCode, OrderStatus, PaymentStatus, PrincipalId};

use super::{PgStore, conflict_on_unique};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{CustomerSnapshot, Order, OrderItem, PaymentMark, StatusUpdate};

const ORDER_COLUMNS: &str = "code, owner_id, items, total, status, payment_status, payment_id, \
     payment_method, branch, location, customer, created_at, updated_at, updated_by";

#[derive(sqlx::FromRow)]
struct OrderRow {
    code: String,
    owner_id: Option<PrincipalId>,
    items: Json<Vec<OrderItem>>,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_id: Option<String>,
    payment_method: String,
    branch: String,
    location: Option<String>,
    customer: Json<CustomerSnapshot>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<PrincipalId>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let code = OrderCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order code in database: {e}"))
        })?;

        Ok(Self {
            code,
            owner: row.owner_id,
            items: row.items.0,
            total: row.total,
            status: row.status,
            payment_status: row.payment_status,
            payment_id: row.payment_id,
            payment_method: row.payment_method,
            branch: row.branch,
            location: row.location,
            customer: row.customer.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders
                (code, owner_id, items, total, status, payment_status, payment_id,
                 payment_method, branch, location, customer, created_at, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(order.code.as_str())
        .bind(order.owner)
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_id.as_deref())
        .bind(&order.payment_method)
        .bind(&order.branch)
        .bind(order.location.as_deref())
        .bind(Json(&order.customer))
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.updated_by)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "order code"))?;

        Ok(())
    }

    async fn find(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, code DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        into_orders(rows)
    }

    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE owner_id = $1
            ORDER BY created_at DESC, code DESC
            "
        ))
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        into_orders(rows)
    }

    async fn update_status(
        &self,
        code: &OrderCode,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET status = $3,
                location = COALESCE($4, location),
                updated_by = $5,
                updated_at = $6
            WHERE code = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(code.as_str())
        .bind(expected)
        .bind(update.status)
        .bind(update.location.as_deref())
        .bind(update.updated_by)
        .bind(update.updated_at)
        .fetch_optional(self.pool())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn mark_paid(
        &self,
        code: &OrderCode,
        payment_id: &str,
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> Result<PaymentMark, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET payment_status = 'paid',
                payment_id = $2,
                updated_by = $3,
                updated_at = $4
            WHERE code = $1 AND payment_status = 'pending'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(code.as_str())
        .bind(payment_id)
        .bind(updated_by)
        .bind(updated_at)
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = row {
            return Ok(PaymentMark::Marked(Order::try_from(row)?));
        }

        // Nothing matched: either already paid or gone.
        Ok(match OrderStore::find(self, code).await? {
            Some(order) => PaymentMark::AlreadyPaid(order),
            None => PaymentMark::Missing,
        })
    }
}
