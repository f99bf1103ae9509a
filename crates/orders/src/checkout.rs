//! Checkout intent: the raw cart submission and its validated form.
//!
//! Validation collects every problem in one pass so the storefront can
//! highlight all offending fields at once. Each problem carries an English
//! and an Arabic message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use teashop_core::{City, ProductId};
use teashop_geofence::{LatLng, LocationInput};

use crate::order::PaymentMethod;

/// Upper bound on a single line's quantity.
pub const MAX_LINE_QUANTITY: u32 = 100;

/// Item as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i64,
    /// Price the client displayed, in halalas.
    #[serde(default)]
    pub unit_price_snapshot: i64,
}

/// Cart submission as it arrives on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub gps_coordinates: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub items: Vec<CheckoutRequestItem>,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    Required,
    InvalidPhone,
    InvalidEmail,
    InvalidCoordinates,
    InvalidPaymentMethod,
    NoItems,
    InvalidProductId,
    InvalidQuantity,
    InvalidPrice,
    DuplicateProduct,
    UnknownProduct,
    PriceChanged,
}

impl IssueCode {
    pub fn message_en(&self) -> &'static str {
        match self {
            IssueCode::Required => "This field is required.",
            IssueCode::InvalidPhone => "Please enter a valid phone number.",
            IssueCode::InvalidEmail => "Please enter a valid email address.",
            IssueCode::InvalidCoordinates => "The delivery location could not be read.",
            IssueCode::InvalidPaymentMethod => "Please choose cash on delivery or online payment.",
            IssueCode::NoItems => "Your cart is empty.",
            IssueCode::InvalidProductId => "One of the products in your cart is invalid.",
            IssueCode::InvalidQuantity => "Quantity must be between 1 and 100.",
            IssueCode::InvalidPrice => "One of the prices in your cart is invalid.",
            IssueCode::DuplicateProduct => "A product appears more than once in your cart.",
            IssueCode::UnknownProduct => "A product in your cart is no longer available.",
            IssueCode::PriceChanged => "A price in your cart has changed. Please review your cart.",
        }
    }

    pub fn message_ar(&self) -> &'static str {
        match self {
            IssueCode::Required => "هذا الحقل مطلوب.",
            IssueCode::InvalidPhone => "يرجى إدخال رقم جوال صحيح.",
            IssueCode::InvalidEmail => "يرجى إدخال بريد إلكتروني صحيح.",
            IssueCode::InvalidCoordinates => "تعذر قراءة موقع التوصيل.",
            IssueCode::InvalidPaymentMethod => {
                "يرجى اختيار الدفع عند الاستلام أو الدفع الإلكتروني."
            }
            IssueCode::NoItems => "سلة التسوق فارغة.",
            IssueCode::InvalidProductId => "أحد المنتجات في السلة غير صالح.",
            IssueCode::InvalidQuantity => "يجب أن تكون الكمية بين 1 و 100.",
            IssueCode::InvalidPrice => "أحد الأسعار في السلة غير صالح.",
            IssueCode::DuplicateProduct => "يوجد منتج مكرر في السلة.",
            IssueCode::UnknownProduct => "أحد المنتجات في السلة لم يعد متوفراً.",
            IssueCode::PriceChanged => "تغير سعر أحد المنتجات. يرجى مراجعة السلة.",
        }
    }
}

/// One rejected field. `field` uses wire names, e.g. `items[1].quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub code: IssueCode,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, code: IssueCode) -> Self {
        Self {
            field: field.into(),
            code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checkout rejected: {}", summarize(.issues))]
pub struct CheckoutRejected {
    pub issues: Vec<FieldIssue>,
}

impl CheckoutRejected {
    pub fn single(field: impl Into<String>, code: IssueCode) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, code)],
        }
    }

    /// Message of the first issue; what the storefront shows in its toast.
    pub fn message_en(&self) -> &'static str {
        self.issues
            .first()
            .map(|i| i.code.message_en())
            .unwrap_or("Invalid request.")
    }

    pub fn message_ar(&self) -> &'static str {
        self.issues
            .first()
            .map(|i| i.code.message_ar())
            .unwrap_or("طلب غير صالح.")
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {:?}", i.field, i.code))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDetails {
    pub name: String,
    /// Digits only, with a leading `+` when one was given.
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_snapshot: u64,
}

/// A checkout that passed field validation. Catalog and stock checks happen later.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutIntent {
    pub customer: CustomerDetails,
    pub coordinates: Option<LatLng>,
    /// `None` when absent or not a city we know.
    pub declared_city: Option<City>,
    pub lines: Vec<CheckoutLine>,
    pub payment_method: PaymentMethod,
}

impl CheckoutIntent {
    pub fn total_packs(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    pub fn location(&self) -> LocationInput {
        LocationInput {
            coordinates: self.coordinates,
            declared_city: self.declared_city,
        }
    }
}

fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' => {}
            _ => return None,
        }
    }
    if !(9..=15).contains(&digits.len()) {
        return None;
    }
    Some(if plus { format!("+{digits}") } else { digits })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl CheckoutRequest {
    pub fn validate(self) -> Result<CheckoutIntent, CheckoutRejected> {
        let mut issues = Vec::new();

        let name = self.customer_name.trim();
        if name.is_empty() {
            issues.push(FieldIssue::new("customerName", IssueCode::Required));
        }
        let address = self.customer_address.trim();
        if address.is_empty() {
            issues.push(FieldIssue::new("customerAddress", IssueCode::Required));
        }

        let phone = if self.customer_phone.trim().is_empty() {
            issues.push(FieldIssue::new("customerPhone", IssueCode::Required));
            None
        } else {
            let p = normalize_phone(&self.customer_phone);
            if p.is_none() {
                issues.push(FieldIssue::new("customerPhone", IssueCode::InvalidPhone));
            }
            p
        };

        let email = non_blank(self.customer_email.as_deref()).map(str::to_string);
        if let Some(e) = &email {
            if !is_plausible_email(e) {
                issues.push(FieldIssue::new("customerEmail", IssueCode::InvalidEmail));
            }
        }

        let coordinates = match non_blank(self.gps_coordinates.as_deref()) {
            None => None,
            Some(raw) => match raw.parse::<LatLng>() {
                Ok(p) => Some(p),
                Err(_) => {
                    issues.push(FieldIssue::new("gpsCoordinates", IssueCode::InvalidCoordinates));
                    None
                }
            },
        };

        let declared_city =
            non_blank(self.delivery_city.as_deref()).and_then(|c| c.parse::<City>().ok());

        let payment_method = PaymentMethod::parse(&self.payment_method);
        if payment_method.is_none() {
            issues.push(FieldIssue::new("paymentMethod", IssueCode::InvalidPaymentMethod));
        }

        if self.items.is_empty() {
            issues.push(FieldIssue::new("items", IssueCode::NoItems));
        }
        let mut lines: Vec<CheckoutLine> = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            let product_id = item.product_id.trim().parse::<ProductId>().ok();
            if product_id.is_none() {
                issues.push(FieldIssue::new(
                    format!("items[{idx}].productId"),
                    IssueCode::InvalidProductId,
                ));
            }
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q));
            if quantity.is_none() {
                issues.push(FieldIssue::new(
                    format!("items[{idx}].quantity"),
                    IssueCode::InvalidQuantity,
                ));
            }
            let price = u64::try_from(item.unit_price_snapshot).ok().filter(|p| *p > 0);
            if price.is_none() {
                issues.push(FieldIssue::new(
                    format!("items[{idx}].unitPriceSnapshot"),
                    IssueCode::InvalidPrice,
                ));
            }

            if let Some(pid) = product_id {
                if lines.iter().any(|l| l.product_id == pid) {
                    issues.push(FieldIssue::new(
                        format!("items[{idx}].productId"),
                        IssueCode::DuplicateProduct,
                    ));
                    continue;
                }
            }
            if let (Some(product_id), Some(quantity), Some(unit_price_snapshot)) =
                (product_id, quantity, price)
            {
                lines.push(CheckoutLine {
                    product_id,
                    quantity,
                    unit_price_snapshot,
                });
            }
        }

        match (phone, payment_method) {
            (Some(phone), Some(payment_method)) if issues.is_empty() => Ok(CheckoutIntent {
                customer: CustomerDetails {
                    name: name.to_string(),
                    phone,
                    email,
                    address: address.to_string(),
                },
                coordinates,
                declared_city,
                lines,
                payment_method,
            }),
            _ => Err(CheckoutRejected { issues }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(pid: &ProductId, qty: i64) -> CheckoutRequestItem {
        CheckoutRequestItem {
            product_id: pid.to_string(),
            quantity: qty,
            unit_price_snapshot: 4500,
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Noura".to_string(),
            customer_email: Some("noura@example.com".to_string()),
            customer_phone: "+966 50 123 4567".to_string(),
            customer_address: "Olaya St, Riyadh".to_string(),
            gps_coordinates: Some("24.7136,46.6753".to_string()),
            delivery_city: Some("Riyadh".to_string()),
            items: vec![item(&ProductId::new(), 2)],
            payment_method: "cod".to_string(),
        }
    }

    fn codes(err: &CheckoutRejected) -> Vec<(&str, IssueCode)> {
        err.issues.iter().map(|i| (i.field.as_str(), i.code)).collect()
    }

    #[test]
    fn valid_request_produces_intent() {
        let intent = request().validate().unwrap();
        assert_eq!(intent.customer.phone, "+966501234567");
        assert_eq!(intent.declared_city, Some(City::Riyadh));
        assert_eq!(intent.payment_method, PaymentMethod::Cod);
        assert_eq!(intent.total_packs(), 2);
        assert!(intent.coordinates.is_some());
    }

    #[test]
    fn all_missing_fields_are_reported_together() {
        let err = CheckoutRequest::default().validate().unwrap_err();
        let got = codes(&err);
        assert!(got.contains(&("customerName", IssueCode::Required)));
        assert!(got.contains(&("customerAddress", IssueCode::Required)));
        assert!(got.contains(&("customerPhone", IssueCode::Required)));
        assert!(got.contains(&("paymentMethod", IssueCode::InvalidPaymentMethod)));
        assert!(got.contains(&("items", IssueCode::NoItems)));
    }

    #[test]
    fn bad_phone_and_email_are_rejected() {
        let mut req = request();
        req.customer_phone = "call me".to_string();
        req.customer_email = Some("noura.example.com".to_string());
        let err = req.validate().unwrap_err();
        assert_eq!(
            codes(&err),
            vec![
                ("customerPhone", IssueCode::InvalidPhone),
                ("customerEmail", IssueCode::InvalidEmail)
            ]
        );
    }

    #[test]
    fn blank_email_is_treated_as_absent() {
        let mut req = request();
        req.customer_email = Some("   ".to_string());
        assert_eq!(req.validate().unwrap().customer.email, None);
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let mut req = request();
        req.gps_coordinates = Some("95.0,46.6".to_string());
        let err = req.validate().unwrap_err();
        assert_eq!(codes(&err), vec![("gpsCoordinates", IssueCode::InvalidCoordinates)]);
    }

    #[test]
    fn unknown_declared_city_is_dropped_not_rejected() {
        let mut req = request();
        req.delivery_city = Some("Dammam".to_string());
        assert_eq!(req.validate().unwrap().declared_city, None);
    }

    #[test]
    fn zero_negative_and_huge_quantities_are_rejected() {
        let mut req = request();
        req.items = vec![
            item(&ProductId::new(), 0),
            item(&ProductId::new(), -3),
            item(&ProductId::new(), 101),
        ];
        let err = req.validate().unwrap_err();
        assert_eq!(
            codes(&err),
            vec![
                ("items[0].quantity", IssueCode::InvalidQuantity),
                ("items[1].quantity", IssueCode::InvalidQuantity),
                ("items[2].quantity", IssueCode::InvalidQuantity),
            ]
        );
    }

    #[test]
    fn duplicate_product_lines_are_rejected() {
        let pid = ProductId::new();
        let mut req = request();
        req.items = vec![item(&pid, 1), item(&pid, 2)];
        let err = req.validate().unwrap_err();
        assert_eq!(codes(&err), vec![("items[1].productId", IssueCode::DuplicateProduct)]);
    }

    #[test]
    fn rejection_messages_are_bilingual() {
        let err = CheckoutRejected::single("items", IssueCode::NoItems);
        assert_eq!(err.message_en(), "Your cart is empty.");
        assert_eq!(err.message_ar(), "سلة التسوق فارغة.");
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let json = r#"{
            "customerName": "Sara",
            "customerPhone": "0501234567",
            "customerAddress": "Tahlia St",
            "deliveryCity": "Jeddah",
            "items": [{
                "productId": "0190f2a0-0000-7000-8000-000000000001",
                "quantity": 5,
                "unitPriceSnapshot": 3000
            }],
            "paymentMethod": "online"
        }"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        let intent = req.validate().unwrap();
        assert_eq!(intent.declared_city, Some(City::Jeddah));
        assert_eq!(intent.payment_method, PaymentMethod::Online);
        assert_eq!(intent.lines[0].quantity, 5);
        assert_eq!(intent.coordinates, None);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn total_packs_is_sum_of_quantities(qtys in proptest::collection::vec(1i64..=100, 1..8)) {
            let mut req = request();
            req.items = qtys.iter().map(|q| item(&ProductId::new(), *q)).collect();
            let intent = req.validate().unwrap();
            prop_assert_eq!(i64::from(intent.total_packs()), qtys.iter().sum::<i64>());
        }
    }
}
