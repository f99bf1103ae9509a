use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use teashop_core::{City, OrderId, ProductId};
use teashop_inventory::{CompensationOutcome, DeductOutcome, StockBook, StockLedgerEntry};

use super::{InventoryLedger, LedgerError};

/// In-memory ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInventoryLedger {
    book: Mutex<StockBook>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self) -> Result<MutexGuard<'_, StockBook>, LedgerError> {
        self.book
            .lock()
            .map_err(|_| LedgerError::Storage("lock poisoned".to_string()))
    }

    /// Sum of ledger deltas for (product, city); equals `stock` at all times.
    pub fn ledger_sum(&self, product_id: ProductId, city: City) -> Result<i64, LedgerError> {
        Ok(self.book()?.ledger_sum(product_id, city))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn deduct(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<DeductOutcome, LedgerError> {
        let outcome = self
            .book()?
            .deduct(product_id, city, quantity, order_id, Utc::now())?;
        debug!(?outcome, "deduct");
        Ok(outcome)
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn compensate(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<CompensationOutcome, LedgerError> {
        let outcome = self
            .book()?
            .compensate(product_id, city, quantity, order_id, Utc::now())?;
        debug!(?outcome, "compensate");
        Ok(outcome)
    }

    #[instrument(skip(self), err)]
    async fn restock(&self, product_id: ProductId, city: City, quantity: u32)
    -> Result<i64, LedgerError> {
        Ok(self.book()?.restock(product_id, city, quantity, Utc::now())?)
    }

    async fn stock(&self, product_id: ProductId, city: City) -> Result<i64, LedgerError> {
        Ok(self.book()?.stock(product_id, city))
    }

    async fn stock_by_city(
        &self,
        product_id: ProductId,
    ) -> Result<BTreeMap<City, i64>, LedgerError> {
        Ok(self.book()?.stock_by_city(product_id))
    }

    async fn entries(
        &self,
        product_id: ProductId,
        city: City,
    ) -> Result<Vec<StockLedgerEntry>, LedgerError> {
        Ok(self.book()?.entries_for(product_id, city))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use teashop_core::DomainError;

    fn order() -> OrderId {
        OrderId::generate(Utc::now())
    }

    #[tokio::test]
    async fn deduct_then_compensate_restores_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let p = ProductId::new();
        ledger.restock(p, City::Riyadh, 10).await.unwrap();
        let o = order();

        let out = ledger.deduct(p, City::Riyadh, 4, &o).await.unwrap();
        assert_eq!(out, DeductOutcome::Deducted { new_stock: 6 });

        let back = ledger.compensate(p, City::Riyadh, 4, &o).await.unwrap();
        assert_eq!(back, CompensationOutcome::Credited { new_stock: 10 });

        let again = ledger.compensate(p, City::Riyadh, 4, &o).await.unwrap();
        assert_eq!(again, CompensationOutcome::AlreadyCompensated { stock: 10 });

        let entries = ledger.entries(p, City::Riyadh).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(ledger.ledger_sum(p, City::Riyadh).unwrap(), 10);
    }

    #[tokio::test]
    async fn cities_are_independent() {
        let ledger = InMemoryInventoryLedger::new();
        let p = ProductId::new();
        ledger.restock(p, City::Riyadh, 3).await.unwrap();

        let out = ledger.deduct(p, City::Jeddah, 1, &order()).await.unwrap();
        assert_eq!(out, DeductOutcome::Insufficient { available: 0, requested: 1 });

        let by_city = ledger.stock_by_city(p).await.unwrap();
        assert_eq!(by_city.get(&City::Riyadh), Some(&3));
        assert_eq!(by_city.get(&City::Jeddah), None);
    }

    #[tokio::test]
    async fn zero_quantity_is_a_validation_error() {
        let ledger = InMemoryInventoryLedger::new();
        let err = ledger.restock(ProductId::new(), City::Riyadh, 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_deducts_never_oversell() {
        let ledger = Arc::new(InMemoryInventoryLedger::new());
        let p = ProductId::new();
        ledger.restock(p, City::Jeddah, 25).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.deduct(p, City::Jeddah, 2, &order()).await.unwrap()
            }));
        }

        let mut successes = 0;
        for h in handles {
            if h.await.unwrap().is_success() {
                successes += 1;
            }
        }

        assert_eq!(successes, 12);
        assert_eq!(ledger.stock(p, City::Jeddah).await.unwrap(), 1);
        assert_eq!(ledger.ledger_sum(p, City::Jeddah).unwrap(), 1);
    }
}
