//! In-memory stock arena: counters + append-only ledger.
//!
//! `StockBook` is the reference implementation of the ledger rules. Every
//! mutating method is a single `&mut self` call, so whoever owns the book
//! (a mutex in `teashop-infra`) gets check-and-write atomicity for free.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teashop_core::{City, DomainError, DomainResult, OrderId, ProductId};

use crate::ledger::{LedgerReason, StockLedgerEntry};

/// Remaining stock at or below this level raises a low-stock signal.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

pub fn is_low_stock(remaining: i64, threshold: i64) -> bool {
    remaining <= threshold
}

/// Result of a conditional deduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeductOutcome {
    Deducted { new_stock: i64 },
    Insufficient { available: i64, requested: i64 },
}

impl DeductOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeductOutcome::Deducted { .. })
    }
}

/// Result of a compensation request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompensationOutcome {
    Credited { new_stock: i64 },
    /// A compensation row already exists for (order, product); nothing written.
    AlreadyCompensated { stock: i64 },
    /// No deduction was ever recorded for (order, product); nothing written.
    NothingToCompensate,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Deduction {
    city: City,
    quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct StockBook {
    counters: HashMap<(ProductId, City), i64>,
    entries: Vec<StockLedgerEntry>,
    deductions: HashMap<(OrderId, ProductId), Deduction>,
    compensations: HashSet<(OrderId, ProductId)>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(&self, product_id: ProductId, city: City) -> i64 {
        self.counters.get(&(product_id, city)).copied().unwrap_or(0)
    }

    pub fn stock_by_city(&self, product_id: ProductId) -> BTreeMap<City, i64> {
        self.counters
            .iter()
            .filter(|((p, _), _)| *p == product_id)
            .map(|((_, c), s)| (*c, *s))
            .collect()
    }

    pub fn entries(&self) -> &[StockLedgerEntry] {
        &self.entries
    }

    pub fn entries_for(&self, product_id: ProductId, city: City) -> Vec<StockLedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.product_id == product_id && e.city == city)
            .cloned()
            .collect()
    }

    pub fn ledger_sum(&self, product_id: ProductId, city: City) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.product_id == product_id && e.city == city)
            .map(|e| e.quantity_delta)
            .sum()
    }

    /// Decrement stock by `quantity` only if current stock ≥ `quantity`.
    ///
    /// A product may be deducted at most once per order; line items are
    /// expected to be merged per product before reaching the ledger.
    pub fn deduct(
        &mut self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<DeductOutcome> {
        let requested = positive(quantity)?;
        let key = (order_id.clone(), product_id);
        if self.deductions.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "product {product_id} already deducted for order {order_id}"
            )));
        }

        let available = self.stock(product_id, city);
        if available < requested {
            return Ok(DeductOutcome::Insufficient {
                available,
                requested,
            });
        }

        let new_stock = available - requested;
        self.counters.insert((product_id, city), new_stock);
        self.deductions.insert(
            key,
            Deduction {
                city,
                quantity: requested,
            },
        );
        self.entries.push(StockLedgerEntry {
            product_id,
            city,
            quantity_delta: -requested,
            order_id: Some(order_id.clone()),
            reason: LedgerReason::Deduction,
            occurred_at,
        });

        Ok(DeductOutcome::Deducted { new_stock })
    }

    /// Reverse the deduction recorded for (order, product). Idempotent.
    pub fn compensate(
        &mut self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        order_id: &OrderId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CompensationOutcome> {
        let quantity = positive(quantity)?;
        let key = (order_id.clone(), product_id);

        if self.compensations.contains(&key) {
            return Ok(CompensationOutcome::AlreadyCompensated {
                stock: self.stock(product_id, city),
            });
        }

        let Some(deduction) = self.deductions.get(&key).copied() else {
            return Ok(CompensationOutcome::NothingToCompensate);
        };
        if deduction.city != city || deduction.quantity != quantity {
            return Err(DomainError::invariant(format!(
                "compensation of {quantity} in {city} does not match deduction of {} in {} \
                 (order {order_id}, product {product_id})",
                deduction.quantity, deduction.city
            )));
        }

        let new_stock = self.stock(product_id, city) + quantity;
        self.counters.insert((product_id, city), new_stock);
        self.compensations.insert(key);
        self.entries.push(StockLedgerEntry {
            product_id,
            city,
            quantity_delta: quantity,
            order_id: Some(order_id.clone()),
            reason: LedgerReason::Compensation,
            occurred_at,
        });

        Ok(CompensationOutcome::Credited { new_stock })
    }

    /// Add new stock (deliveries from suppliers, opening balances).
    pub fn restock(
        &mut self,
        product_id: ProductId,
        city: City,
        quantity: u32,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<i64> {
        let quantity = positive(quantity)?;
        let new_stock = self.stock(product_id, city) + quantity;
        self.counters.insert((product_id, city), new_stock);
        self.entries.push(StockLedgerEntry {
            product_id,
            city,
            quantity_delta: quantity,
            order_id: None,
            reason: LedgerReason::Restock,
            occurred_at,
        });
        Ok(new_stock)
    }
}

fn positive(quantity: u32) -> DomainResult<i64> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(i64::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn order() -> OrderId {
        OrderId::generate(now())
    }

    fn book_with(product: ProductId, city: City, qty: u32) -> StockBook {
        let mut book = StockBook::new();
        book.restock(product, city, qty, now()).unwrap();
        book
    }

    #[test]
    fn deduct_succeeds_when_stock_is_sufficient() {
        let p = ProductId::new();
        let mut book = book_with(p, City::Riyadh, 10);

        let outcome = book.deduct(p, City::Riyadh, 6, &order(), now()).unwrap();
        assert_eq!(outcome, DeductOutcome::Deducted { new_stock: 4 });
        assert_eq!(book.stock(p, City::Riyadh), 4);
    }

    #[test]
    fn deduct_reports_available_and_requested_without_writing() {
        let p = ProductId::new();
        let mut book = book_with(p, City::Riyadh, 4);
        let before = book.entries().len();

        let outcome = book.deduct(p, City::Riyadh, 6, &order(), now()).unwrap();
        assert_eq!(
            outcome,
            DeductOutcome::Insufficient {
                available: 4,
                requested: 6
            }
        );
        assert_eq!(book.stock(p, City::Riyadh), 4);
        assert_eq!(book.entries().len(), before);
    }

    #[test]
    fn stock_is_partitioned_by_city() {
        let p = ProductId::new();
        let mut book = book_with(p, City::Riyadh, 10);

        let outcome = book.deduct(p, City::Jeddah, 1, &order(), now()).unwrap();
        assert_eq!(
            outcome,
            DeductOutcome::Insufficient {
                available: 0,
                requested: 1
            }
        );
        assert_eq!(book.stock(p, City::Riyadh), 10);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let p = ProductId::new();
        let mut book = book_with(p, City::Riyadh, 10);
        assert!(matches!(
            book.deduct(p, City::Riyadh, 0, &order(), now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            book.restock(p, City::Riyadh, 0, now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn second_deduction_for_same_order_and_product_is_a_conflict() {
        let p = ProductId::new();
        let o = order();
        let mut book = book_with(p, City::Riyadh, 10);

        book.deduct(p, City::Riyadh, 2, &o, now()).unwrap();
        let err = book.deduct(p, City::Riyadh, 2, &o, now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(book.stock(p, City::Riyadh), 8);
    }

    #[test]
    fn compensation_is_idempotent_per_order_and_product() {
        let p = ProductId::new();
        let o = order();
        let mut book = book_with(p, City::Riyadh, 10);
        book.deduct(p, City::Riyadh, 3, &o, now()).unwrap();

        let first = book.compensate(p, City::Riyadh, 3, &o, now()).unwrap();
        let second = book.compensate(p, City::Riyadh, 3, &o, now()).unwrap();

        assert_eq!(first, CompensationOutcome::Credited { new_stock: 10 });
        assert_eq!(second, CompensationOutcome::AlreadyCompensated { stock: 10 });
        assert_eq!(book.stock(p, City::Riyadh), 10);
        assert_eq!(
            book.entries_for(p, City::Riyadh)
                .iter()
                .filter(|e| e.reason == LedgerReason::Compensation)
                .count(),
            1
        );
    }

    #[test]
    fn compensating_without_a_deduction_writes_nothing() {
        let p = ProductId::new();
        let mut book = book_with(p, City::Riyadh, 10);

        let outcome = book.compensate(p, City::Riyadh, 3, &order(), now()).unwrap();
        assert_eq!(outcome, CompensationOutcome::NothingToCompensate);
        assert_eq!(book.stock(p, City::Riyadh), 10);
    }

    #[test]
    fn compensation_must_match_the_recorded_deduction() {
        let p = ProductId::new();
        let o = order();
        let mut book = book_with(p, City::Riyadh, 10);
        book.deduct(p, City::Riyadh, 3, &o, now()).unwrap();

        assert!(matches!(
            book.compensate(p, City::Riyadh, 4, &o, now()),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(matches!(
            book.compensate(p, City::Jeddah, 3, &o, now()),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(book.stock(p, City::Riyadh), 7);
    }

    #[test]
    fn low_stock_threshold_is_inclusive() {
        assert!(is_low_stock(5, LOW_STOCK_THRESHOLD));
        assert!(!is_low_stock(6, LOW_STOCK_THRESHOLD));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Restock { product: usize, city: usize, qty: u32 },
        Deduct { product: usize, city: usize, qty: u32, order: usize },
        Compensate { product: usize, order: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..2usize, 0..2usize, 1..20u32)
                .prop_map(|(product, city, qty)| Op::Restock { product, city, qty }),
            (0..2usize, 0..2usize, 1..15u32, 0..6usize)
                .prop_map(|(product, city, qty, order)| Op::Deduct { product, city, qty, order }),
            (0..2usize, 0..6usize).prop_map(|(product, order)| Op::Compensate { product, order }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of restock/deduct/compensate operations,
        /// every counter equals the sum of its ledger deltas and never goes negative.
        #[test]
        fn stock_always_equals_ledger_sum(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let products = [ProductId::new(), ProductId::new()];
            let cities = City::ALL;
            let orders: Vec<OrderId> = (0..6).map(|_| order()).collect();
            let mut deducted: HashMap<(usize, usize), (City, u32)> = HashMap::new();
            let mut book = StockBook::new();

            for op in ops {
                match op {
                    Op::Restock { product, city, qty } => {
                        book.restock(products[product], cities[city], qty, now()).unwrap();
                    }
                    Op::Deduct { product, city, qty, order } => {
                        if let Ok(DeductOutcome::Deducted { .. }) =
                            book.deduct(products[product], cities[city], qty, &orders[order], now())
                        {
                            deducted.insert((product, order), (cities[city], qty));
                        }
                    }
                    Op::Compensate { product, order } => {
                        if let Some((city, qty)) = deducted.get(&(product, order)).copied() {
                            book.compensate(products[product], city, qty, &orders[order], now())
                                .unwrap();
                        }
                    }
                }

                for p in products {
                    for c in cities {
                        let stock = book.stock(p, c);
                        prop_assert!(stock >= 0);
                        prop_assert_eq!(stock, book.ledger_sum(p, c));
                    }
                }
            }
        }
    }
}
