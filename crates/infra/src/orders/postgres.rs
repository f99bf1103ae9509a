use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use teashop_core::{City, OrderId};
use teashop_orders::{CustomerSnapshot, LineItem, Order, OrderStatus, PaymentMethod};

use super::{OrderRepository, RepositoryError};
use crate::db;

const SELECT_ORDER: &str = r#"
    SELECT id, customer, city, line_items, subtotal, delivery_fee, total,
           payment_method, free_delivery, status, created_at, updated_at
      FROM orders
     WHERE id = $1
"#;

#[derive(Debug, Clone)]
pub struct PostgresOrderRepository {
    pool: Arc<PgPool>,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(db::describe(operation, &err))
}

fn corrupt(what: &str, detail: impl core::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(format!("corrupt order row ({what}): {detail}"))
}

fn money(value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| RepositoryError::Storage("amount out of range".to_string()))
}

fn order_from_row(row: &PgRow) -> Result<Order, RepositoryError> {
    let get_err = |e: sqlx::Error| map_sqlx_error("decode_order", e);

    let id: String = row.try_get("id").map_err(get_err)?;
    let customer: serde_json::Value = row.try_get("customer").map_err(get_err)?;
    let city: String = row.try_get("city").map_err(get_err)?;
    let line_items: serde_json::Value = row.try_get("line_items").map_err(get_err)?;
    let subtotal: i64 = row.try_get("subtotal").map_err(get_err)?;
    let delivery_fee: i64 = row.try_get("delivery_fee").map_err(get_err)?;
    let total: i64 = row.try_get("total").map_err(get_err)?;
    let payment_method: String = row.try_get("payment_method").map_err(get_err)?;
    let free_delivery: bool = row.try_get("free_delivery").map_err(get_err)?;
    let status: String = row.try_get("status").map_err(get_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    let amount = |v: i64, what: &str| u64::try_from(v).map_err(|e| corrupt(what, e));

    Ok(Order::restore(
        id.parse::<OrderId>().map_err(|e| corrupt("id", e))?,
        serde_json::from_value::<CustomerSnapshot>(customer).map_err(|e| corrupt("customer", e))?,
        city.parse::<City>().map_err(|e| corrupt("city", e))?,
        serde_json::from_value::<Vec<LineItem>>(line_items)
            .map_err(|e| corrupt("line_items", e))?,
        amount(subtotal, "subtotal")?,
        amount(delivery_fee, "delivery_fee")?,
        amount(total, "total")?,
        PaymentMethod::parse(&payment_method)
            .ok_or_else(|| corrupt("payment_method", &payment_method))?,
        free_delivery,
        status.parse::<OrderStatus>().map_err(|e| corrupt("status", e))?,
        created_at,
        updated_at,
    ))
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let customer = serde_json::to_value(order.customer())
            .map_err(|e| RepositoryError::Storage(format!("customer serialization failed: {e}")))?;
        let line_items = serde_json::to_value(order.line_items())
            .map_err(|e| RepositoryError::Storage(format!("line item serialization failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer, city, line_items, subtotal, delivery_fee, total,
                payment_method, free_delivery, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id_typed().as_str())
        .bind(customer)
        .bind(order.city().as_str())
        .bind(line_items)
        .bind(money(order.subtotal())?)
        .bind(money(order.delivery_fee())?)
        .bind(money(order.total())?)
        .bind(order.payment_method().as_str())
        .bind(order.free_delivery())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                RepositoryError::Duplicate(order.id_typed().clone())
            } else {
                map_sqlx_error("insert_order", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(SELECT_ORDER)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        from.ensure_transition(to)?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
               SET status = $1, updated_at = $2
             WHERE id = $3 AND status = $4
            RETURNING id, customer, city, line_items, subtotal, delivery_fee, total,
                      payment_method, free_delivery, status, created_at, updated_at
            "#,
        )
        .bind(to.as_str())
        .bind(at)
        .bind(id.as_str())
        .bind(from.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_status", e))?;

        if let Some(row) = updated {
            return order_from_row(&row);
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_status", e))?;
        match current {
            None => Err(RepositoryError::NotFound),
            Some(found) => Err(RepositoryError::StaleStatus {
                expected: from,
                found: found.parse().map_err(|e| corrupt("status", e))?,
            }),
        }
    }
}
