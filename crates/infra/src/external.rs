//! Boundaries to services outside the fulfillment core.
//!
//! Only the interfaces are fixed here. The implementations in this module are
//! the ones a dev process runs with: a logging sender, a plain-text invoice
//! and a hosted payment page link.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use teashop_core::OrderId;
use teashop_events::OrderCreated;
use teashop_geofence::LatLng;
use teashop_orders::Order;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Email,
    WhatsApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::WhatsApp => "whatsapp",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: Option<String>,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
            attachment: None,
        }
    }
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), ExternalError>;
}

#[async_trait]
pub trait InvoiceRenderer: Send + Sync {
    /// Render an invoice document for a persisted order.
    async fn render(&self, order: &OrderCreated) -> Result<Attachment, ExternalError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session; returns the URL to redirect the customer to.
    async fn create_checkout_session(&self, order: &Order) -> Result<String, ExternalError>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, point: LatLng) -> Result<String, ExternalError>;
}

/// Sender that only writes a log line. Used when no provider is configured.
#[derive(Debug, Clone, Copy)]
pub struct LoggingMessageSender {
    channel: Channel,
}

impl LoggingMessageSender {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl MessageSender for LoggingMessageSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), ExternalError> {
        info!(
            channel = %self.channel,
            to,
            subject = message.subject.as_deref().unwrap_or(""),
            attachment = message.attachment.as_ref().map(|a| a.filename.as_str()).unwrap_or(""),
            "outbound message"
        );
        Ok(())
    }
}

/// Plain-text invoice. Stands in for the PDF renderer outside production.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextInvoiceRenderer;

fn sar(halalas: u64) -> String {
    format!("{}.{:02} SAR", halalas / 100, halalas % 100)
}

#[async_trait]
impl InvoiceRenderer for PlainTextInvoiceRenderer {
    async fn render(&self, order: &OrderCreated) -> Result<Attachment, ExternalError> {
        let mut text = format!(
            "INVOICE {}\nDate: {}\nCustomer: {}\nAddress: {}\n\n",
            order.order_id,
            order.occurred_at.format("%Y-%m-%d %H:%M UTC"),
            order.customer_name,
            order.customer_address,
        );
        for line in &order.lines {
            let line_total = line.unit_price.saturating_mul(u64::from(line.quantity));
            text.push_str(&format!(
                "{} x{} @ {} = {}\n",
                line.name,
                line.quantity,
                sar(line.unit_price),
                sar(line_total)
            ));
        }
        text.push_str(&format!(
            "\nSubtotal: {}\nDelivery: {}\nTotal: {}\n",
            sar(order.subtotal),
            if order.free_delivery {
                "free".to_string()
            } else {
                sar(order.delivery_fee)
            },
            sar(order.total)
        ));

        Ok(Attachment {
            filename: format!("invoice-{}.txt", order.order_id),
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes: text.into_bytes(),
        })
    }
}

/// Payment "gateway" that points at a hosted payment page keyed by order id.
#[derive(Debug, Clone)]
pub struct HostedPaymentPage {
    base_url: String,
}

impl HostedPaymentPage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, order_id: &OrderId) -> String {
        format!("{}/pay/{}", self.base_url, order_id)
    }
}

#[async_trait]
impl PaymentGateway for HostedPaymentPage {
    async fn create_checkout_session(&self, order: &Order) -> Result<String, ExternalError> {
        if order.total() == 0 {
            return Err(ExternalError::Rejected("nothing to pay".to_string()));
        }
        Ok(self.url_for(order.id_typed()))
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingMessageSender;
    use super::*;
    use chrono::{TimeZone, Utc};
    use teashop_core::{City, ProductId};
    use teashop_events::OrderCreatedLine;

    fn created() -> OrderCreated {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        OrderCreated {
            order_id: OrderId::generate(at),
            city: City::Riyadh,
            customer_name: "Noura".to_string(),
            customer_phone: "+966500000000".to_string(),
            customer_email: None,
            customer_address: "Olaya St".to_string(),
            lines: vec![OrderCreatedLine {
                product_id: ProductId::new(),
                name: "Sencha".to_string(),
                quantity: 2,
                unit_price: 3950,
            }],
            subtotal: 7900,
            delivery_fee: 2500,
            total: 10400,
            free_delivery: false,
            payment_method: "cod".to_string(),
            occurred_at: at,
        }
    }

    #[tokio::test]
    async fn plain_text_invoice_lists_lines_and_totals() {
        let order = created();
        let doc = PlainTextInvoiceRenderer.render(&order).await.unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();
        assert!(text.contains("Sencha x2 @ 39.50 SAR = 79.00 SAR"));
        assert!(text.contains("Delivery: 25.00 SAR"));
        assert!(text.contains("Total: 104.00 SAR"));
        assert_eq!(doc.filename, format!("invoice-{}.txt", order.order_id));
    }

    #[tokio::test]
    async fn recording_sender_records_or_fails() {
        let ok = RecordingMessageSender::new(Channel::WhatsApp);
        ok.send("+966500000000", &OutboundMessage::text("hi")).await.unwrap();
        assert_eq!(ok.sent().len(), 1);

        let bad = RecordingMessageSender::failing(Channel::Email);
        assert!(bad.send("a@b.co", &OutboundMessage::text("hi")).await.is_err());
        assert!(bad.sent().is_empty());
    }

    #[test]
    fn hosted_payment_page_url() {
        let page = HostedPaymentPage::new("https://pay.example.com/");
        let id: OrderId = "TEA-20250301093000-0a1b2c3d".parse().unwrap();
        assert_eq!(page.url_for(&id), "https://pay.example.com/pay/TEA-20250301093000-0a1b2c3d");
    }
}
