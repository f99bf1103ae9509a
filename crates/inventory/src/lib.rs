//! Inventory domain module.
//!
//! This crate contains business rules for city-partitioned stock, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Storage
//! adapters in `teashop-infra` either wrap [`StockBook`] behind a lock or
//! express the same rules as conditional SQL.

pub mod book;
pub mod ledger;
pub mod product;

pub use book::{CompensationOutcome, DeductOutcome, LOW_STOCK_THRESHOLD, StockBook, is_low_stock};
pub use ledger::{LedgerReason, StockLedgerEntry};
pub use product::Product;
