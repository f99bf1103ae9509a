//! Per-(product, city) stock counters with an append-only ledger.
//!
//! The ledger is the only writer of stock. Two backends implement the same
//! contract:
//!
//! - [`InMemoryInventoryLedger`]: a [`StockBook`](teashop_inventory::StockBook)
//!   behind one mutex; the check and the write happen in one lock acquisition.
//! - [`PostgresInventoryLedger`]: a single conditional `UPDATE ... WHERE stock >= $q`
//!   plus the ledger insert, in one transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use teashop_core::{City, DomainError, OrderId, ProductId};
use teashop_inventory::{CompensationOutcome, DeductOutcome, StockLedgerEntry};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryInventoryLedger;
pub use postgres::PostgresInventoryLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected by ledger rules (bad quantity, repeated deduction, mismatched compensation).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("ledger storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Conditionally decrement stock. Never goes below zero.
    async fn deduct(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<DeductOutcome, LedgerError>;

    /// Reverse the deduction recorded for (order, product). Idempotent.
    async fn compensate(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<CompensationOutcome, LedgerError>;

    /// Add stock; returns the new level.
    async fn restock(&self, product_id: ProductId, city: City, quantity: u32)
    -> Result<i64, LedgerError>;

    async fn stock(&self, product_id: ProductId, city: City) -> Result<i64, LedgerError>;

    async fn stock_by_city(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<City, i64>, LedgerError>;

    /// Ledger rows for (product, city), oldest first.
    async fn entries(
        &self,
        product_id: ProductId,
        city: City,
    ) -> Result<Vec<StockLedgerEntry>, LedgerError>;
}

#[async_trait]
impl<L> InventoryLedger for Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    async fn deduct(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<DeductOutcome, LedgerError> {
        (**self).deduct(product_id, city, quantity, order_id).await
    }

    async fn compensate(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<CompensationOutcome, LedgerError> {
        (**self).compensate(product_id, city, quantity, order_id).await
    }

    async fn restock(&self, product_id: ProductId, city: City, quantity: u32)
    -> Result<i64, LedgerError> {
        (**self).restock(product_id, city, quantity).await
    }

    async fn stock(&self, product_id: ProductId, city: City) -> Result<i64, LedgerError> {
        (**self).stock(product_id, city).await
    }

    async fn stock_by_city(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<City, i64>, LedgerError> {
        (**self).stock_by_city(product_id).await
    }

    async fn entries(
        &self,
        product_id: ProductId,
        city: City,
    ) -> Result<Vec<StockLedgerEntry>, LedgerError> {
        (**self).entries(product_id, city).await
    }
}
