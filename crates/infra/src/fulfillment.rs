//! Checkout pipeline: intent → eligibility → stock → order → notifications.
//!
//! ```text
//! CheckoutRequest
//!   ↓ validate fields                          (Validation, no side effects)
//!   ↓ evaluate delivery eligibility            (UnsupportedLocation, no side effects)
//!   ↓ price lines against the catalog          (Validation, no side effects)
//!   ↓ reverse geocode (bounded, optional)
//!   ↓ deduct each line in order                (InsufficientStock → compensate earlier lines)
//!   ↓ insert order                             (Persistence → compensate every line)
//!   ↓ publish OrderCreated / LowStock          (failures logged only)
//!   ↓ payment session for online orders (bounded, optional)
//! CheckoutReceipt
//! ```
//!
//! There is no reconciliation job: a crash between the first deduction and
//! the order insert leaves deductions without an order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use teashop_core::{City, DomainError, OrderId, ProductId};
use teashop_events::{EventBus, FulfillmentEvent, LowStock};
use teashop_geofence::{DeliveryEligibility, EligibilityPolicy, LocationInput, UnsupportedLocation};
use teashop_inventory::{
    CompensationOutcome, DeductOutcome, LOW_STOCK_THRESHOLD, Product, StockLedgerEntry,
    is_low_stock,
};
use teashop_orders::{
    CheckoutIntent, CheckoutRejected, CheckoutRequest, CustomerSnapshot, FieldIssue, IssueCode,
    LineItem, Order, OrderStatus, PaymentMethod,
};

use crate::catalog::{CatalogError, ProductCatalog};
use crate::external::{PaymentGateway, ReverseGeocoder};
use crate::ledger::{InventoryLedger, LedgerError};
use crate::orders::{OrderRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Checkout fields or catalog snapshot rejected.
    #[error(transparent)]
    Validation(#[from] CheckoutRejected),

    /// Any other malformed input (bad id, zero quantity).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    UnsupportedLocation(#[from] UnsupportedLocation),

    #[error(
        "insufficient stock for {product_name} ({product_id}) in {city}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        city: City,
        available: i64,
        requested: i64,
    },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("not found")]
    NotFound,

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl FulfillmentError {
    /// Stable machine-readable kind for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::Validation(_) | FulfillmentError::InvalidInput(_) => "validation",
            FulfillmentError::UnsupportedLocation(_) => "unsupported_location",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::Persistence(_) => "persistence",
            FulfillmentError::NotFound => "not_found",
            FulfillmentError::InvalidTransition(_) => "invalid_transition",
            FulfillmentError::Conflict(_) => "conflict",
        }
    }

    /// Whether the same request may succeed if sent again.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            FulfillmentError::InsufficientStock { .. } | FulfillmentError::Persistence(_)
        )
    }

    pub fn message_en(&self) -> String {
        match self {
            FulfillmentError::Validation(r) => r.message_en().to_string(),
            FulfillmentError::InvalidInput(_) => "The request is invalid.".to_string(),
            FulfillmentError::UnsupportedLocation(u) => u.message_en().to_string(),
            FulfillmentError::InsufficientStock {
                product_name,
                available,
                ..
            } => format!("Only {available} of {product_name} left in stock."),
            FulfillmentError::Persistence(_) => {
                "We could not save your order. Please try again.".to_string()
            }
            FulfillmentError::NotFound => "Not found.".to_string(),
            FulfillmentError::InvalidTransition(_) => {
                "This order cannot move to that status.".to_string()
            }
            FulfillmentError::Conflict(_) => {
                "The request conflicts with existing data.".to_string()
            }
        }
    }

    pub fn message_ar(&self) -> String {
        match self {
            FulfillmentError::Validation(r) => r.message_ar().to_string(),
            FulfillmentError::InvalidInput(_) => "الطلب غير صالح.".to_string(),
            FulfillmentError::UnsupportedLocation(u) => u.message_ar().to_string(),
            FulfillmentError::InsufficientStock {
                product_name,
                available,
                ..
            } => format!("المتبقي من {product_name} في المخزون {available} فقط."),
            FulfillmentError::Persistence(_) => {
                "تعذر حفظ طلبك. يرجى المحاولة مرة أخرى.".to_string()
            }
            FulfillmentError::NotFound => "غير موجود.".to_string(),
            FulfillmentError::InvalidTransition(_) => {
                "لا يمكن نقل الطلب إلى هذه الحالة.".to_string()
            }
            FulfillmentError::Conflict(_) => "الطلب يتعارض مع بيانات موجودة.".to_string(),
        }
    }
}

impl From<DomainError> for FulfillmentError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                FulfillmentError::InvalidInput(msg)
            }
            DomainError::InvariantViolation(msg) | DomainError::Conflict(msg) => {
                FulfillmentError::Conflict(msg)
            }
        }
    }
}

impl From<LedgerError> for FulfillmentError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Domain(d) => d.into(),
            LedgerError::Storage(msg) => FulfillmentError::Persistence(msg),
        }
    }
}

impl From<RepositoryError> for FulfillmentError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => FulfillmentError::NotFound,
            RepositoryError::StaleStatus { .. } => {
                FulfillmentError::InvalidTransition(value.to_string())
            }
            RepositoryError::Duplicate(id) => {
                FulfillmentError::Conflict(format!("order {id} already exists"))
            }
            RepositoryError::Domain(DomainError::InvariantViolation(msg)) => {
                FulfillmentError::InvalidTransition(msg)
            }
            RepositoryError::Domain(d) => d.into(),
            RepositoryError::Storage(msg) => FulfillmentError::Persistence(msg),
        }
    }
}

impl From<CatalogError> for FulfillmentError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::DuplicateSku(_) => FulfillmentError::Conflict(value.to_string()),
            CatalogError::Storage(msg) => FulfillmentError::Persistence(msg),
        }
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub eligibility: DeliveryEligibility,
    /// Hosted payment page for online orders, when the gateway answered in time.
    pub payment_url: Option<String>,
}

/// A line that was deducted and may need to be given back.
#[derive(Debug, Clone)]
struct Reservation {
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    new_stock: i64,
}

/// Orchestrates checkout and the order lifecycle over the storage traits.
///
/// Generic over the event bus so tests can observe published events on an
/// in-memory bus while the service runs on the notification dispatcher.
pub struct CheckoutService<B> {
    ledger: Arc<dyn InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn ProductCatalog>,
    bus: B,
    policy: EligibilityPolicy,
    low_stock_threshold: i64,
    payments: Option<(Arc<dyn PaymentGateway>, Duration)>,
    geocoder: Option<(Arc<dyn ReverseGeocoder>, Duration)>,
}

impl<B> CheckoutService<B>
where
    B: EventBus<FulfillmentEvent>,
{
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn ProductCatalog>,
        bus: B,
    ) -> Self {
        Self {
            ledger,
            orders,
            catalog,
            bus,
            policy: EligibilityPolicy::default(),
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            payments: None,
            geocoder: None,
        }
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_payment_gateway(
        mut self,
        gateway: Arc<dyn PaymentGateway>,
        timeout: Duration,
    ) -> Self {
        self.payments = Some((gateway, timeout));
        self
    }

    pub fn with_reverse_geocoder(
        mut self,
        geocoder: Arc<dyn ReverseGeocoder>,
        timeout: Duration,
    ) -> Self {
        self.geocoder = Some((geocoder, timeout));
        self
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn evaluate_eligibility(
        &self,
        location: &LocationInput,
        total_packs: u32,
    ) -> Result<DeliveryEligibility, FulfillmentError> {
        Ok(self.policy.evaluate(location, total_packs)?)
    }

    /// Turn a cart submission into a persisted order.
    #[instrument(skip(self, request), fields(items = request.items.len()), err)]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, FulfillmentError> {
        let intent = request.validate()?;
        let eligibility = self.policy.evaluate(&intent.location(), intent.total_packs())?;
        let city = eligibility.fulfillment_city;
        let line_items = self.price_lines(&intent).await?;
        let resolved_address = self.resolve_address(&intent).await;

        let now = Utc::now();
        let order = Order::place(
            OrderId::generate(now),
            CustomerSnapshot {
                name: intent.customer.name.clone(),
                phone: intent.customer.phone.clone(),
                email: intent.customer.email.clone(),
                address: intent.customer.address.clone(),
                gps: intent.coordinates,
                resolved_address,
            },
            city,
            line_items,
            eligibility.delivery_fee,
            eligibility.qualifies,
            intent.payment_method,
            now,
        )?;

        let reservations = self.reserve(&order).await?;

        if let Err(e) = self.orders.insert(&order).await {
            error!(order_id = %order.id_typed(), error = %e, "order insert failed; compensating");
            self.release(order.id_typed(), city, &reservations).await;
            return Err(match e {
                RepositoryError::Storage(msg) => FulfillmentError::Persistence(msg),
                other => FulfillmentError::Persistence(other.to_string()),
            });
        }

        info!(
            order_id = %order.id_typed(),
            %city,
            total = order.total(),
            free_delivery = order.free_delivery(),
            "order created"
        );

        self.announce(&order, &reservations);
        let payment_url = self.payment_url(&order).await;

        Ok(CheckoutReceipt {
            order,
            eligibility,
            payment_url,
        })
    }

    /// Snapshot name and price from the catalog; the client's price must match.
    async fn price_lines(
        &self,
        intent: &CheckoutIntent,
    ) -> Result<Vec<LineItem>, FulfillmentError> {
        let mut issues = Vec::new();
        let mut items = Vec::with_capacity(intent.lines.len());

        for (idx, line) in intent.lines.iter().enumerate() {
            match self.catalog.get(line.product_id).await? {
                None => issues.push(FieldIssue::new(
                    format!("items[{idx}].productId"),
                    IssueCode::UnknownProduct,
                )),
                Some(product) if product.unit_price() != line.unit_price_snapshot => {
                    issues.push(FieldIssue::new(
                        format!("items[{idx}].unitPriceSnapshot"),
                        IssueCode::PriceChanged,
                    ))
                }
                Some(product) => items.push(LineItem {
                    product_id: line.product_id,
                    name: product.name().to_string(),
                    unit_price: product.unit_price(),
                    quantity: line.quantity,
                }),
            }
        }

        if issues.is_empty() {
            Ok(items)
        } else {
            Err(CheckoutRejected { issues }.into())
        }
    }

    async fn resolve_address(&self, intent: &CheckoutIntent) -> Option<String> {
        let (geocoder, timeout) = self.geocoder.as_ref()?;
        let point = intent.coordinates?;
        match tokio::time::timeout(*timeout, geocoder.reverse(point)).await {
            Ok(Ok(address)) => Some(address),
            Ok(Err(e)) => {
                warn!(error = %e, %point, "reverse geocoding failed; keeping raw coordinates");
                None
            }
            Err(_) => {
                warn!(?timeout, %point, "reverse geocoding timed out; keeping raw coordinates");
                None
            }
        }
    }

    /// Deduct every line in sequence; on the first failure give back what was taken.
    async fn reserve(&self, order: &Order) -> Result<Vec<Reservation>, FulfillmentError> {
        let city = order.city();
        let order_id = order.id_typed();
        let mut reserved: Vec<Reservation> = Vec::with_capacity(order.line_items().len());

        for line in order.line_items() {
            let outcome = self
                .ledger
                .deduct(line.product_id, city, line.quantity, order_id)
                .await;

            let failure = match outcome {
                Ok(DeductOutcome::Deducted { new_stock }) => {
                    reserved.push(Reservation {
                        product_id: line.product_id,
                        product_name: line.name.clone(),
                        quantity: line.quantity,
                        new_stock,
                    });
                    continue;
                }
                Ok(DeductOutcome::Insufficient {
                    available,
                    requested,
                }) => FulfillmentError::InsufficientStock {
                    product_id: line.product_id,
                    product_name: line.name.clone(),
                    city,
                    available,
                    requested,
                },
                Err(e) => e.into(),
            };

            warn!(
                %order_id,
                product_id = %line.product_id,
                error = %failure,
                "deduction failed; compensating"
            );
            self.release(order_id, city, &reserved).await;
            return Err(failure);
        }

        Ok(reserved)
    }

    /// Compensate reservations in reverse order. Failures are logged for manual repair.
    async fn release(&self, order_id: &OrderId, city: City, reserved: &[Reservation]) {
        for r in reserved.iter().rev() {
            match self
                .ledger
                .compensate(r.product_id, city, r.quantity, order_id)
                .await
            {
                Ok(CompensationOutcome::Credited { new_stock }) => {
                    info!(%order_id, product_id = %r.product_id, new_stock, "compensated")
                }
                Ok(other) => warn!(
                    %order_id,
                    product_id = %r.product_id,
                    ?other,
                    "compensation had no effect"
                ),
                Err(e) => error!(
                    %order_id,
                    product_id = %r.product_id,
                    quantity = r.quantity,
                    error = %e,
                    "compensation failed; stock needs manual repair"
                ),
            }
        }
    }

    fn announce(&self, order: &Order, reservations: &[Reservation]) {
        if let Err(e) = self
            .bus
            .publish(FulfillmentEvent::OrderCreated(order.created_event()))
        {
            warn!(order_id = %order.id_typed(), error = ?e, "order notification not queued");
        }

        for r in reservations
            .iter()
            .filter(|r| is_low_stock(r.new_stock, self.low_stock_threshold))
        {
            let signal = LowStock {
                product_id: r.product_id,
                product_name: r.product_name.clone(),
                city: order.city(),
                remaining: r.new_stock,
                threshold: self.low_stock_threshold,
                order_id: order.id_typed().clone(),
                occurred_at: order.created_at(),
            };
            if let Err(e) = self.bus.publish(FulfillmentEvent::LowStock(signal)) {
                warn!(product_id = %r.product_id, error = ?e, "low-stock signal not queued");
            }
        }
    }

    async fn payment_url(&self, order: &Order) -> Option<String> {
        if order.payment_method() != PaymentMethod::Online {
            return None;
        }
        let (gateway, timeout) = self.payments.as_ref()?;
        match tokio::time::timeout(*timeout, gateway.create_checkout_session(order)).await {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                warn!(order_id = %order.id_typed(), error = %e, "payment session failed");
                None
            }
            Err(_) => {
                warn!(order_id = %order.id_typed(), ?timeout, "payment session timed out");
                None
            }
        }
    }

    pub async fn order(&self, id: &OrderId) -> Result<Order, FulfillmentError> {
        self.orders.get(id).await?.ok_or(FulfillmentError::NotFound)
    }

    /// Advance an order's status. Cancelling gives its stock back.
    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn update_status(
        &self,
        id: &OrderId,
        next: OrderStatus,
    ) -> Result<Order, FulfillmentError> {
        let current = self.order(id).await?;
        current
            .status()
            .ensure_transition(next)
            .map_err(|e| FulfillmentError::InvalidTransition(e.to_string()))?;

        let updated = self
            .orders
            .update_status(id, current.status(), next, Utc::now())
            .await?;
        info!(from = %current.status(), to = %next, "order status changed");

        if next == OrderStatus::Cancelled {
            let reservations: Vec<Reservation> = updated
                .line_items()
                .iter()
                .map(|l| Reservation {
                    product_id: l.product_id,
                    product_name: l.name.clone(),
                    quantity: l.quantity,
                    new_stock: 0,
                })
                .collect();
            self.release(id, updated.city(), &reservations).await;
        }

        Ok(updated)
    }

    pub async fn upsert_product(&self, product: Product) -> Result<(), FulfillmentError> {
        Ok(self.catalog.upsert(product).await?)
    }

    /// Catalog entry with current stock per city.
    pub async fn product(&self, id: ProductId) -> Result<Product, FulfillmentError> {
        let product = self.catalog.get(id).await?.ok_or(FulfillmentError::NotFound)?;
        let stock = self.ledger.stock_by_city(id).await?;
        Ok(product.with_stock(stock))
    }

    #[instrument(skip(self), err)]
    pub async fn restock(
        &self,
        product_id: ProductId,
        city: City,
        quantity: u32,
    ) -> Result<i64, FulfillmentError> {
        if self.catalog.get(product_id).await?.is_none() {
            return Err(FulfillmentError::NotFound);
        }
        if !self.policy.regions.is_serviceable(city) {
            return Err(FulfillmentError::InvalidInput(format!("{city} is not serviceable")));
        }
        let new_stock = self.ledger.restock(product_id, city, quantity).await?;
        info!(%product_id, %city, quantity, new_stock, "restocked");
        Ok(new_stock)
    }

    pub async fn ledger(
        &self,
        product_id: ProductId,
        city: City,
    ) -> Result<Vec<StockLedgerEntry>, FulfillmentError> {
        if self.catalog.get(product_id).await?.is_none() {
            return Err(FulfillmentError::NotFound);
        }
        Ok(self.ledger.entries(product_id, city).await?)
    }
}
