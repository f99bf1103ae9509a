use std::sync::Arc;

use anyhow::Context;
use teashop_infra::{
    AppConfig, CheckoutService, InMemoryInventoryLedger, InMemoryOrderRepository,
    InMemoryProductCatalog, InventoryLedger, NotificationDispatcher, OrderRepository,
    PostgresInventoryLedger, PostgresOrderRepository, PostgresProductCatalog, ProductCatalog, db,
    external::{
        Channel, HostedPaymentPage, InvoiceRenderer, LoggingMessageSender, MessageSender,
        PlainTextInvoiceRenderer,
    },
    notifications::DispatcherSettings,
};

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub checkout: CheckoutService<NotificationDispatcher>,
}

struct Stores {
    ledger: Arc<dyn InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn ProductCatalog>,
}

/// Wire storage, notifications and optional integrations from config.
///
/// Postgres is used when `database_url` is set (schema is applied on start);
/// otherwise everything lives in memory for local development and tests.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let stores = match &config.database_url {
        Some(url) => build_postgres_stores(url).await?,
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage");
            build_in_memory_stores()
        }
    };

    let senders: Vec<Arc<dyn MessageSender>> = vec![
        Arc::new(LoggingMessageSender::new(Channel::WhatsApp)),
        Arc::new(LoggingMessageSender::new(Channel::Email)),
    ];
    let settings = DispatcherSettings {
        admin_phone: config.admin_phone.clone(),
        admin_email: config.admin_email.clone(),
        send_timeout: config.notify_timeout,
    };
    let invoices: Arc<dyn InvoiceRenderer> = Arc::new(PlainTextInvoiceRenderer);
    let (dispatcher, _worker) = NotificationDispatcher::spawn(senders, Some(invoices), settings);

    let mut checkout =
        CheckoutService::new(stores.ledger, stores.orders, stores.catalog, dispatcher)
            .with_low_stock_threshold(config.low_stock_threshold);

    if let Some(base_url) = &config.payment_page_url {
        checkout = checkout.with_payment_gateway(
            Arc::new(HostedPaymentPage::new(base_url.clone())),
            config.payment_timeout,
        );
    }

    Ok(AppServices { checkout })
}

async fn build_postgres_stores(url: &str) -> anyhow::Result<Stores> {
    let pool = db::connect(url).await.context("failed to connect to postgres")?;
    db::migrate(&pool).await.context("failed to apply schema")?;
    tracing::info!("connected to postgres");

    Ok(Stores {
        ledger: Arc::new(PostgresInventoryLedger::new(pool.clone())),
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        catalog: Arc::new(PostgresProductCatalog::new(pool)),
    })
}

fn build_in_memory_stores() -> Stores {
    Stores {
        ledger: Arc::new(InMemoryInventoryLedger::new()),
        orders: Arc::new(InMemoryOrderRepository::new()),
        catalog: Arc::new(InMemoryProductCatalog::new()),
    }
}
