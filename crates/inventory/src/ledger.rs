use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teashop_core::{City, OrderId, ProductId};

/// Why a ledger row exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerReason {
    Deduction,
    Compensation,
    Restock,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::Deduction => "deduction",
            LedgerReason::Compensation => "compensation",
            LedgerReason::Restock => "restock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deduction" => Some(LedgerReason::Deduction),
            "compensation" => Some(LedgerReason::Compensation),
            "restock" => Some(LedgerReason::Restock),
            _ => None,
        }
    }
}

/// Append-only audit row. For any (product, city), current stock equals the
/// sum of `quantity_delta` over all rows for that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedgerEntry {
    pub product_id: ProductId,
    pub city: City,
    /// Negative for deductions, positive for compensation and restock.
    pub quantity_delta: i64,
    /// Absent for restocks.
    pub order_id: Option<OrderId>,
    pub reason: LedgerReason,
    pub occurred_at: DateTime<Utc>,
}
