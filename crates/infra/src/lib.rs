//! Infrastructure layer: storage adapters, the checkout pipeline, configuration
//! and the boundaries to external services.
//!
//! Domain crates stay pure; everything that touches a lock, a database row or
//! a network call lives here.

pub mod catalog;
pub mod config;
pub mod db;
pub mod external;
pub mod fulfillment;
pub mod ledger;
pub mod notifications;
pub mod orders;


pub use catalog::{CatalogError, InMemoryProductCatalog, PostgresProductCatalog, ProductCatalog};
pub use config::AppConfig;
pub use fulfillment::{CheckoutReceipt, CheckoutService, FulfillmentError};
pub use ledger::{InMemoryInventoryLedger, InventoryLedger, LedgerError, PostgresInventoryLedger};
pub use notifications::{NotificationDispatcher, NotificationError};
pub use orders::{
    InMemoryOrderRepository, OrderRepository, PostgresOrderRepository, RepositoryError,
};
