use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teashop_core::{City, DomainError, DomainResult, Entity, OrderId, ProductId};
use teashop_events::{OrderCreated, OrderCreatedLine};
use teashop_geofence::LatLng;

use crate::status::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Some(PaymentMethod::Cod),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

/// Who the order is for, as captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub gps: Option<LatLng>,
    /// Human-readable address from reverse geocoding, when it answered in time.
    pub resolved_address: Option<String>,
}

/// Order line with name and price frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    /// Price in smallest currency unit (halalas).
    pub unit_price: u64,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Option<u64> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

/// A persisted storefront order.
///
/// Everything except `status` / `updated_at` is fixed at [`Order::place`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer: CustomerSnapshot,
    city: City,
    line_items: Vec<LineItem>,
    subtotal: u64,
    delivery_fee: u64,
    total: u64,
    payment_method: PaymentMethod,
    free_delivery: bool,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new `pending` order, computing subtotal and total from the lines.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        id: OrderId,
        customer: CustomerSnapshot,
        city: City,
        line_items: Vec<LineItem>,
        delivery_fee: u64,
        free_delivery: bool,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if line_items.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }
        if line_items.iter().any(|l| l.quantity == 0) {
            return Err(DomainError::validation("line quantity must be positive"));
        }
        if free_delivery && delivery_fee != 0 {
            return Err(DomainError::invariant("free delivery order cannot carry a fee"));
        }

        let subtotal = line_items.iter().try_fold(0u64, |acc, l| {
            l.line_total().and_then(|t| acc.checked_add(t))
        });
        let subtotal = subtotal.ok_or_else(|| DomainError::validation("order total overflows"))?;
        let total = subtotal
            .checked_add(delivery_fee)
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        Ok(Self {
            id,
            customer,
            city,
            line_items,
            subtotal,
            delivery_fee,
            total,
            payment_method,
            free_delivery,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> &OrderId {
        &self.id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn city(&self) -> City {
        self.city
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn delivery_fee(&self) -> u64 {
        self.delivery_fee
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn free_delivery(&self) -> bool {
        self.free_delivery
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn total_packs(&self) -> u32 {
        self.line_items.iter().map(|l| l.quantity).sum()
    }

    /// Move to `next`, enforcing the status state machine.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.status.ensure_transition(next)?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Rebuild an order read back from storage without re-running checks.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        customer: CustomerSnapshot,
        city: City,
        line_items: Vec<LineItem>,
        subtotal: u64,
        delivery_fee: u64,
        total: u64,
        payment_method: PaymentMethod,
        free_delivery: bool,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer,
            city,
            line_items,
            subtotal,
            delivery_fee,
            total,
            payment_method,
            free_delivery,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn created_event(&self) -> OrderCreated {
        OrderCreated {
            order_id: self.id.clone(),
            city: self.city,
            customer_name: self.customer.name.clone(),
            customer_phone: self.customer.phone.clone(),
            customer_email: self.customer.email.clone(),
            customer_address: self
                .customer
                .resolved_address
                .clone()
                .unwrap_or_else(|| self.customer.address.clone()),
            lines: self
                .line_items
                .iter()
                .map(|l| OrderCreatedLine {
                    product_id: l.product_id,
                    name: l.name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            free_delivery: self.free_delivery,
            payment_method: self.payment_method.as_str().to_string(),
            occurred_at: self.created_at,
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            name: "Noura".to_string(),
            phone: "+966500000000".to_string(),
            email: None,
            address: "King Fahd Rd".to_string(),
            gps: Some(LatLng::new(24.7136, 46.6753).unwrap()),
            resolved_address: None,
        }
    }

    fn line(price: u64, qty: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(),
            name: "Oolong".to_string(),
            unit_price: price,
            quantity: qty,
        }
    }

    fn place(lines: Vec<LineItem>, fee: u64, free: bool) -> DomainResult<Order> {
        Order::place(
            OrderId::generate(now()),
            customer(),
            City::Riyadh,
            lines,
            fee,
            free,
            PaymentMethod::Cod,
            now(),
        )
    }

    #[test]
    fn totals_are_computed_from_lines_and_fee() {
        let order = place(vec![line(4500, 2), line(3000, 1)], 2500, false).unwrap();
        assert_eq!(order.subtotal(), 12000);
        assert_eq!(order.total(), 14500);
        assert_eq!(order.total_packs(), 3);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn empty_order_is_rejected() {
        assert!(matches!(place(vec![], 0, true), Err(DomainError::Validation(_))));
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let err = place(vec![line(u64::MAX, 2)], 0, true).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn free_delivery_with_fee_is_an_invariant_violation() {
        let err = place(vec![line(100, 1)], 2500, true).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn transition_only_touches_status_and_updated_at() {
        let mut order = place(vec![line(4500, 5)], 0, true).unwrap();
        let before = order.clone();
        let later = now() + chrono::Duration::minutes(5);

        order.transition(OrderStatus::Confirmed, later).unwrap();

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.updated_at(), later);
        assert_eq!(order.created_at(), before.created_at());
        assert_eq!(order.line_items(), before.line_items());
        assert_eq!(order.total(), before.total());
    }

    #[test]
    fn invalid_transition_leaves_order_untouched() {
        let mut order = place(vec![line(4500, 5)], 0, true).unwrap();
        assert!(order.transition(OrderStatus::Delivered, now()).is_err());
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn created_event_carries_snapshots() {
        let order = place(vec![line(4500, 3)], 0, true).unwrap();
        let event = order.created_event();
        assert_eq!(&event.order_id, order.id_typed());
        assert_eq!(event.lines.len(), 1);
        assert_eq!(event.lines[0].unit_price, 4500);
        assert_eq!(event.total, 13500);
        assert_eq!(event.payment_method, "cod");
    }

    #[test]
    fn serde_roundtrip_preserves_order() {
        let order = place(vec![line(4500, 3)], 0, true).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
