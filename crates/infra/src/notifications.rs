//! Best-effort customer and admin notifications.
//!
//! ```text
//! CheckoutService ──publish──▶ unbounded channel ──▶ worker task ──▶ MessageSender (timeout)
//! ```
//!
//! `publish` only enqueues. The worker delivers each event to every matching
//! channel; a failed or slow delivery is logged and skipped. Nothing here can
//! fail or roll back an order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use teashop_events::{Event, EventBus, FulfillmentEvent, LowStock, OrderCreated};

use crate::external::{Channel, ExternalError, InvoiceRenderer, MessageSender, OutboundMessage};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification queue is closed")]
    QueueClosed,

    #[error("{channel} delivery to {to} timed out after {timeout:?}")]
    Timeout {
        channel: Channel,
        to: String,
        timeout: Duration,
    },

    #[error("{channel} delivery to {to} failed: {source}")]
    Send {
        channel: Channel,
        to: String,
        #[source]
        source: ExternalError,
    },

    #[error("invoice rendering failed: {0}")]
    Invoice(#[source] ExternalError),
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub admin_phone: Option<String>,
    pub admin_email: Option<String>,
    /// Upper bound for a single delivery attempt.
    pub send_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            admin_phone: None,
            admin_email: None,
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle used by the checkout path. Cloning shares the same worker.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<FulfillmentEvent>,
}

impl NotificationDispatcher {
    /// Start the worker on the current tokio runtime.
    ///
    /// The worker exits once every dispatcher handle has been dropped and the
    /// queue is drained.
    pub fn spawn(
        senders: Vec<Arc<dyn MessageSender>>,
        invoices: Option<Arc<dyn InvoiceRenderer>>,
        settings: DispatcherSettings,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            senders,
            invoices,
            settings,
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }
}

impl EventBus<FulfillmentEvent> for NotificationDispatcher {
    type Error = NotificationError;

    fn publish(&self, message: FulfillmentEvent) -> Result<(), Self::Error> {
        self.tx
            .send(message)
            .map_err(|_| NotificationError::QueueClosed)
    }
}

struct Worker {
    senders: Vec<Arc<dyn MessageSender>>,
    invoices: Option<Arc<dyn InvoiceRenderer>>,
    settings: DispatcherSettings,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<FulfillmentEvent>) {
        info!(senders = self.senders.len(), "notification worker started");
        while let Some(event) = rx.recv().await {
            self.dispatch(&event).await;
        }
        info!("notification worker stopped");
    }

    #[instrument(
        skip(self, event),
        fields(
            event_type = event.event_type(),
            version = event.version(),
            order_id = %event.order_id(),
        )
    )]
    async fn dispatch(&self, event: &FulfillmentEvent) {
        let lag = Utc::now() - event.occurred_at();
        debug!(lag_ms = lag.num_milliseconds(), "dispatching event");

        match event {
            FulfillmentEvent::OrderCreated(e) => self.order_created(e).await,
            FulfillmentEvent::LowStock(e) => self.low_stock(e).await,
        }
    }

    #[instrument(skip_all)]
    async fn order_created(&self, event: &OrderCreated) {
        let summary = order_summary(event);

        self.deliver_logged(
            Channel::WhatsApp,
            &event.customer_phone,
            &OutboundMessage::text(customer_confirmation(event, &summary)),
        )
        .await;

        if let Some(email) = &event.customer_email {
            let attachment = match &self.invoices {
                None => None,
                Some(renderer) => match renderer.render(event).await {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(
                            error = %NotificationError::Invoice(e),
                            "sending confirmation without invoice"
                        );
                        None
                    }
                },
            };
            let message = OutboundMessage {
                subject: Some(format!("Order {} confirmed / تم تأكيد طلبك", event.order_id)),
                body: customer_confirmation(event, &summary),
                attachment,
            };
            self.deliver_logged(Channel::Email, email, &message).await;
        }

        let admin = OutboundMessage {
            subject: Some(format!("New order {}", event.order_id)),
            body: format!(
                "New order {} ({})\nCustomer: {} {}\nAddress: {}\nPayment: {}\n{}",
                event.order_id,
                event.city,
                event.customer_name,
                event.customer_phone,
                event.customer_address,
                event.payment_method,
                summary
            ),
            attachment: None,
        };
        self.notify_admin(&admin).await;
    }

    #[instrument(skip(self, event), fields(product_id = %event.product_id, city = %event.city))]
    async fn low_stock(&self, event: &LowStock) {
        let message = OutboundMessage {
            subject: Some(format!("Low stock: {} ({})", event.product_name, event.city)),
            body: format!(
                "{} in {} is down to {} (threshold {}) after order {}.",
                event.product_name, event.city, event.remaining, event.threshold, event.order_id
            ),
            attachment: None,
        };
        self.notify_admin(&message).await;
    }

    async fn notify_admin(&self, message: &OutboundMessage) {
        if let Some(phone) = &self.settings.admin_phone {
            self.deliver_logged(Channel::WhatsApp, phone, message).await;
        }
        if let Some(email) = &self.settings.admin_email {
            self.deliver_logged(Channel::Email, email, message).await;
        }
    }

    async fn deliver_logged(&self, channel: Channel, to: &str, message: &OutboundMessage) {
        for sender in self.senders.iter().filter(|s| s.channel() == channel) {
            match self.deliver(sender.as_ref(), to, message).await {
                Ok(()) => debug!(%channel, to, "delivered"),
                Err(e) => warn!(error = %e, "notification dropped"),
            }
        }
    }

    async fn deliver(
        &self,
        sender: &dyn MessageSender,
        to: &str,
        message: &OutboundMessage,
    ) -> Result<(), NotificationError> {
        let channel = sender.channel();
        match tokio::time::timeout(self.settings.send_timeout, sender.send(to, message)).await {
            Err(_) => Err(NotificationError::Timeout {
                channel,
                to: to.to_string(),
                timeout: self.settings.send_timeout,
            }),
            Ok(Err(source)) => Err(NotificationError::Send {
                channel,
                to: to.to_string(),
                source,
            }),
            Ok(Ok(())) => Ok(()),
        }
    }
}

fn sar(halalas: u64) -> String {
    format!("{}.{:02}", halalas / 100, halalas % 100)
}

fn order_summary(event: &OrderCreated) -> String {
    let mut out = String::new();
    for line in &event.lines {
        out.push_str(&format!("- {} x{}\n", line.name, line.quantity));
    }
    let delivery = if event.free_delivery {
        "free / مجاني".to_string()
    } else {
        format!("{} SAR", sar(event.delivery_fee))
    };
    out.push_str(&format!("Delivery / التوصيل: {delivery}\n"));
    out.push_str(&format!("Total / الإجمالي: {} SAR", sar(event.total)));
    out
}

fn customer_confirmation(event: &OrderCreated, summary: &str) -> String {
    format!(
        "شكراً لطلبك يا {name}! رقم الطلب: {id}\n\
         Thank you for your order, {name}! Order number: {id}\n{summary}",
        name = event.customer_name,
        id = event.order_id,
    )
}
