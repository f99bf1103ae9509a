use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use teashop_geofence::{DeliveryEligibility, ReasonCode};
use teashop_inventory::{Product, StockLedgerEntry};
use teashop_infra::CheckoutReceipt;
use teashop_orders::{LineItem, Order};

// -------------------------
// Requests
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRequest {
    #[serde(default)]
    pub gps_coordinates: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub total_packs: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProductRequest {
    pub sku: String,
    pub name: String,
    /// Halalas.
    pub unit_price: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub city: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub city: Option<String>,
}

// -------------------------
// Responses
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: String,
    pub total: u64,
    pub delivery_fee: u64,
    pub free_delivery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    pub eligibility: EligibilityResponse,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        let order = &receipt.order;
        Self {
            success: true,
            order_id: order.id_typed().to_string(),
            total: order.total(),
            delivery_fee: order.delivery_fee(),
            free_delivery: order.free_delivery(),
            payment_url: receipt.payment_url,
            eligibility: EligibilityResponse::from(&receipt.eligibility),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub qualifies: bool,
    pub distance_km: Option<f64>,
    pub city: Option<String>,
    pub fulfillment_city: String,
    pub total_packs: u32,
    pub reason: Option<ReasonCode>,
    pub reason_codes: Vec<ReasonCode>,
    pub shortfall: u32,
    pub delivery_fee: u64,
}

impl From<&DeliveryEligibility> for EligibilityResponse {
    fn from(e: &DeliveryEligibility) -> Self {
        Self {
            qualifies: e.qualifies,
            distance_km: e.distance_km,
            city: e.city.map(|c| c.to_string()),
            fulfillment_city: e.fulfillment_city.to_string(),
            total_packs: e.total_packs,
            reason: e.reason(),
            reason_codes: e.reason_codes.clone(),
            shortfall: e.shortfall,
            delivery_fee: e.delivery_fee,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub gps_coordinates: Option<String>,
    pub resolved_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub line_total: u64,
}

impl From<&LineItem> for LineItemResponse {
    fn from(l: &LineItem) -> Self {
        Self {
            product_id: l.product_id.to_string(),
            name: l.name.clone(),
            unit_price: l.unit_price,
            quantity: l.quantity,
            // Bounded when the order was placed.
            line_total: l.line_total().unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub city: String,
    pub customer: CustomerResponse,
    pub line_items: Vec<LineItemResponse>,
    pub total_packs: u32,
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub total: u64,
    pub free_delivery: bool,
    pub payment_method: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let customer = order.customer();
        Self {
            order_id: order.id_typed().to_string(),
            status: order.status().as_str().to_string(),
            city: order.city().to_string(),
            customer: CustomerResponse {
                name: customer.name.clone(),
                phone: customer.phone.clone(),
                email: customer.email.clone(),
                address: customer.address.clone(),
                gps_coordinates: customer.gps.map(|g| g.to_string()),
                resolved_address: customer.resolved_address.clone(),
            },
            line_items: order.line_items().iter().map(LineItemResponse::from).collect(),
            total_packs: order.total_packs(),
            subtotal: order.subtotal(),
            delivery_fee: order.delivery_fee(),
            total: order.total(),
            free_delivery: order.free_delivery(),
            payment_method: order.payment_method().as_str().to_string(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub unit_price: u64,
    pub stock_by_city: BTreeMap<String, i64>,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id_typed().to_string(),
            sku: p.sku().to_string(),
            name: p.name().to_string(),
            unit_price: p.unit_price(),
            stock_by_city: p
                .stock_by_city()
                .iter()
                .map(|(city, stock)| (city.to_string(), *stock))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockResponse {
    pub product_id: String,
    pub city: String,
    pub stock: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub product_id: String,
    pub city: String,
    pub quantity_delta: i64,
    pub order_id: Option<String>,
    pub reason: String,
    pub occurred_at: String,
}

impl From<&StockLedgerEntry> for LedgerEntryResponse {
    fn from(e: &StockLedgerEntry) -> Self {
        Self {
            product_id: e.product_id.to_string(),
            city: e.city.to_string(),
            quantity_delta: e.quantity_delta,
            order_id: e.order_id.as_ref().map(|id| id.to_string()),
            reason: e.reason.as_str().to_string(),
            occurred_at: e.occurred_at.to_rfc3339(),
        }
    }
}
