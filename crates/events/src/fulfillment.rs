//! Events raised by the checkout pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teashop_core::{City, OrderId, ProductId};

use crate::event::Event;

/// One purchased line as carried in [`OrderCreated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Price in smallest currency unit (halalas).
    pub unit_price: u64,
}

/// Event: an order was durably persisted.
///
/// Self-contained so that notification channels and invoice rendering never
/// need to read back from the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub city: City,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: String,
    pub lines: Vec<OrderCreatedLine>,
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub total: u64,
    pub free_delivery: bool,
    pub payment_method: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a deduction left a (product, city) counter at or below the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStock {
    pub product_id: ProductId,
    pub product_name: String,
    pub city: City,
    pub remaining: i64,
    pub threshold: i64,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentEvent {
    OrderCreated(OrderCreated),
    LowStock(LowStock),
}

impl Event for FulfillmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FulfillmentEvent::OrderCreated(_) => "fulfillment.order.created",
            FulfillmentEvent::LowStock(_) => "fulfillment.stock.low",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FulfillmentEvent::OrderCreated(e) => e.occurred_at,
            FulfillmentEvent::LowStock(e) => e.occurred_at,
        }
    }
}

impl FulfillmentEvent {
    pub fn order_id(&self) -> &OrderId {
        match self {
            FulfillmentEvent::OrderCreated(e) => &e.order_id,
            FulfillmentEvent::LowStock(e) => &e.order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn created(order_id: &OrderId) -> FulfillmentEvent {
        FulfillmentEvent::OrderCreated(OrderCreated {
            order_id: order_id.clone(),
            city: City::Riyadh,
            customer_name: "Noura".to_string(),
            customer_phone: "+966501234567".to_string(),
            customer_email: None,
            customer_address: "Olaya St".to_string(),
            lines: vec![OrderCreatedLine {
                product_id: ProductId::new(),
                name: "Oolong".to_string(),
                quantity: 5,
                unit_price: 4500,
            }],
            subtotal: 22500,
            delivery_fee: 0,
            total: 22500,
            free_delivery: true,
            payment_method: "cod".to_string(),
            occurred_at: at(),
        })
    }

    #[test]
    fn event_metadata_comes_from_the_payload() {
        let order_id = OrderId::generate(at());
        let created = created(&order_id);
        let low = FulfillmentEvent::LowStock(LowStock {
            product_id: ProductId::new(),
            product_name: "Oolong".to_string(),
            city: City::Jeddah,
            remaining: 2,
            threshold: 5,
            order_id: order_id.clone(),
            occurred_at: at(),
        });

        assert_eq!(created.event_type(), "fulfillment.order.created");
        assert_eq!(low.event_type(), "fulfillment.stock.low");
        assert_eq!(created.version(), 1);
        assert_eq!(low.version(), 1);
        assert_eq!(created.occurred_at(), at());
        assert_eq!(created.order_id(), &order_id);
        assert_eq!(low.order_id(), &order_id);
    }
}
