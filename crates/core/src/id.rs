//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a catalog product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(ProductId, "ProductId");

/// External-facing order reference: `TEA-<YYYYMMDDHHMMSS>-<8 hex>`.
///
/// This is the id printed on invoices, sent in notifications and used for
/// tracking, so it stays human-readable rather than a bare UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub const PREFIX: &'static str = "TEA";

    /// Generate a fresh id for an order placed at `now`.
    ///
    /// The suffix is the random tail of a UUIDv7, so two orders placed in the
    /// same second still get distinct ids.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let uuid = Uuid::now_v7().simple().to_string();
        let suffix = &uuid[uuid.len() - 8..];
        Self(format!(
            "{}-{}-{}",
            Self::PREFIX,
            now.format("%Y%m%d%H%M%S"),
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let (Some(prefix), Some(stamp), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DomainError::invalid_id(format!("OrderId: malformed '{s}'")));
        };

        if prefix != Self::PREFIX {
            return Err(DomainError::invalid_id(format!(
                "OrderId: expected prefix '{}'",
                Self::PREFIX
            )));
        }
        if stamp.len() != 14 || !stamp.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::invalid_id("OrderId: bad timestamp segment"));
        }
        if suffix.len() != 8 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::invalid_id("OrderId: bad suffix segment"));
        }

        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_order_id_round_trips_through_from_str() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let id = OrderId::generate(now);

        assert!(id.as_str().starts_with("TEA-20260314092653-"));
        let parsed: OrderId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn order_ids_generated_in_the_same_second_are_distinct() {
        let now = Utc::now();
        let a = OrderId::generate(now);
        let b = OrderId::generate(now);
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_order_ids_are_rejected() {
        for bad in [
            "",
            "TEA",
            "ORD-20260314092653-abcdef12",
            "TEA-2026-abcdef12",
            "TEA-20260314092653-xyz",
        ] {
            assert!(bad.parse::<OrderId>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn product_id_parse_failure_is_invalid_id() {
        let err = "not-a-uuid".parse::<ProductId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.contains("ProductId")));
    }
}
