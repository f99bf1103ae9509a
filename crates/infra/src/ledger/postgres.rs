//! Postgres-backed inventory ledger.
//!
//! `city_stock` holds one counter row per (product, city); `stock_ledger` is
//! append-only. Every mutation updates the counter and inserts the ledger row
//! in the same transaction, so `stock == Σ quantity_delta` holds at commit.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError | Scenario |
//! |------------|----------------------|-------------|----------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` | Second row for (order, product) |
//! | Database (check violation) | `23514` | `Storage` | Counter would go negative |
//! | Anything else | any | `Storage` | Connection, pool, protocol failures |

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument, warn};

use teashop_core::{City, DomainError, OrderId, ProductId};
use teashop_inventory::{
    CompensationOutcome, DeductOutcome, LedgerReason, StockLedgerEntry,
};

use super::{InventoryLedger, LedgerError};
use crate::db;

#[derive(Debug, Clone)]
pub struct PostgresInventoryLedger {
    pool: Arc<PgPool>,
}

impl PostgresInventoryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, LedgerError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    if db::is_unique_violation(&err) {
        return LedgerError::Domain(DomainError::conflict(db::describe(operation, &err)));
    }
    LedgerError::Storage(db::describe(operation, &err))
}

fn positive(quantity: u32) -> Result<i64, LedgerError> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be positive").into());
    }
    Ok(i64::from(quantity))
}

async fn current_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    city: City,
) -> Result<i64, LedgerError> {
    let stock: Option<i64> =
        sqlx::query_scalar("SELECT stock FROM city_stock WHERE product_id = $1 AND city = $2")
            .bind(product_id.as_uuid())
            .bind(city.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("read_stock", e))?;
    Ok(stock.unwrap_or(0))
}

async fn append_entry(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    city: City,
    delta: i64,
    order_id: Option<&OrderId>,
    reason: LedgerReason,
    occurred_at: DateTime<Utc>,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO stock_ledger (product_id, city, quantity_delta, order_id, reason, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(product_id.as_uuid())
    .bind(city.as_str())
    .bind(delta)
    .bind(order_id.map(OrderId::as_str))
    .bind(reason.as_str())
    .bind(occurred_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_ledger_entry", e))?;
    Ok(())
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn deduct(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<DeductOutcome, LedgerError> {
        let requested = positive(quantity)?;
        let mut tx = self.begin().await?;

        // Compare-and-swap on the counter row.
        let new_stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE city_stock
               SET stock = stock - $1
             WHERE product_id = $2 AND city = $3 AND stock >= $1
            RETURNING stock
            "#,
        )
        .bind(requested)
        .bind(product_id.as_uuid())
        .bind(city.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("conditional_deduct", e))?;

        let Some(new_stock) = new_stock else {
            let available = current_stock(&mut tx, product_id, city).await?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            debug!(available, requested, "insufficient stock");
            return Ok(DeductOutcome::Insufficient {
                available,
                requested,
            });
        };

        append_entry(
            &mut tx,
            product_id,
            city,
            -requested,
            Some(order_id),
            LedgerReason::Deduction,
            Utc::now(),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(DeductOutcome::Deducted { new_stock })
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn compensate(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<CompensationOutcome, LedgerError> {
        let quantity = positive(quantity)?;
        let mut tx = self.begin().await?;

        // Lock the deduction row so concurrent compensations serialize here.
        let deduction = sqlx::query(
            r#"
            SELECT city, quantity_delta
              FROM stock_ledger
             WHERE order_id = $1 AND product_id = $2 AND reason = 'deduction'
               FOR UPDATE
            "#,
        )
        .bind(order_id.as_str())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_deduction", e))?;

        let Some(row) = deduction else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(CompensationOutcome::NothingToCompensate);
        };

        let already: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM stock_ledger
                 WHERE order_id = $1 AND product_id = $2 AND reason = 'compensation'
            )
            "#,
        )
        .bind(order_id.as_str())
        .bind(product_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_compensation", e))?;

        if already {
            let stock = current_stock(&mut tx, product_id, city).await?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(CompensationOutcome::AlreadyCompensated { stock });
        }

        let deducted_city: String = row
            .try_get("city")
            .map_err(|e| map_sqlx_error("read_deduction", e))?;
        let deducted_delta: i64 = row
            .try_get("quantity_delta")
            .map_err(|e| map_sqlx_error("read_deduction", e))?;
        if deducted_city != city.as_str() || -deducted_delta != quantity {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            warn!(deducted_city, deducted_delta, "compensation does not match deduction");
            return Err(DomainError::invariant(format!(
                "compensation of {quantity} in {city} does not match \
                 deduction of {} in {deducted_city}",
                -deducted_delta
            ))
            .into());
        }

        let new_stock: i64 = sqlx::query_scalar(
            r#"
            UPDATE city_stock
               SET stock = stock + $1
             WHERE product_id = $2 AND city = $3
            RETURNING stock
            "#,
        )
        .bind(quantity)
        .bind(product_id.as_uuid())
        .bind(city.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("credit_stock", e))?;

        append_entry(
            &mut tx,
            product_id,
            city,
            quantity,
            Some(order_id),
            LedgerReason::Compensation,
            Utc::now(),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(CompensationOutcome::Credited { new_stock })
    }

    #[instrument(skip(self), err)]
    async fn restock(&self, product_id: ProductId, city: City, quantity: u32)
    -> Result<i64, LedgerError> {
        let quantity = positive(quantity)?;
        let mut tx = self.begin().await?;

        let new_stock: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO city_stock (product_id, city, stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, city)
            DO UPDATE SET stock = city_stock.stock + EXCLUDED.stock
            RETURNING stock
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(city.as_str())
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("restock", e))?;

        append_entry(
            &mut tx,
            product_id,
            city,
            quantity,
            None,
            LedgerReason::Restock,
            Utc::now(),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(new_stock)
    }

    #[instrument(skip(self), err)]
    async fn stock(&self, product_id: ProductId, city: City) -> Result<i64, LedgerError> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM city_stock WHERE product_id = $1 AND city = $2")
                .bind(product_id.as_uuid())
                .bind(city.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("read_stock", e))?;
        Ok(stock.unwrap_or(0))
    }

    #[instrument(skip(self), err)]
    async fn stock_by_city(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<City, i64>, LedgerError> {
        let rows = sqlx::query("SELECT city, stock FROM city_stock WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_stock_by_city", e))?;

        let mut out = BTreeMap::new();
        for row in rows {
            let city: String = row
                .try_get("city")
                .map_err(|e| map_sqlx_error("read_stock_by_city", e))?;
            let stock: i64 = row
                .try_get("stock")
                .map_err(|e| map_sqlx_error("read_stock_by_city", e))?;
            let city: City = city.parse().map_err(|e: DomainError| {
                LedgerError::Storage(format!("bad city in city_stock: {e}"))
            })?;
            out.insert(city, stock);
        }
        Ok(out)
    }

    #[instrument(skip(self), err)]
    async fn entries(
        &self,
        product_id: ProductId,
        city: City,
    ) -> Result<Vec<StockLedgerEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT quantity_delta, order_id, reason, occurred_at
              FROM stock_ledger
             WHERE product_id = $1 AND city = $2
             ORDER BY id ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(city.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("read_ledger", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let quantity_delta: i64 = row
                .try_get("quantity_delta")
                .map_err(|e| map_sqlx_error("read_ledger", e))?;
            let order_id: Option<String> = row
                .try_get("order_id")
                .map_err(|e| map_sqlx_error("read_ledger", e))?;
            let reason: String = row
                .try_get("reason")
                .map_err(|e| map_sqlx_error("read_ledger", e))?;
            let occurred_at: DateTime<Utc> = row
                .try_get("occurred_at")
                .map_err(|e| map_sqlx_error("read_ledger", e))?;

            let order_id = order_id
                .map(|s| s.parse::<OrderId>())
                .transpose()
                .map_err(|e| LedgerError::Storage(format!("bad order id in ledger: {e}")))?;
            let reason = LedgerReason::parse(&reason)
                .ok_or_else(|| LedgerError::Storage(format!("bad ledger reason '{reason}'")))?;

            entries.push(StockLedgerEntry {
                product_id,
                city,
                quantity_delta,
                order_id,
                reason,
                occurred_at,
            });
        }
        Ok(entries)
    }
}
