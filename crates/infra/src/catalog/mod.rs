//! Product catalog: SKU, name and price. Stock lives in the ledger.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use teashop_core::ProductId;
use teashop_inventory::Product;

mod in_memory;
mod postgres;

pub use in_memory::InMemoryProductCatalog;
pub use postgres::PostgresProductCatalog;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("sku '{0}' already belongs to another product")]
    DuplicateSku(String),

    #[error("catalog storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    /// Insert or replace the catalog entry. Orders already written keep their snapshots.
    async fn upsert(&self, product: Product) -> Result<(), CatalogError>;
}

#[async_trait]
impl<C> ProductCatalog for Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    async fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        (**self).get(id).await
    }

    async fn upsert(&self, product: Product) -> Result<(), CatalogError> {
        (**self).upsert(product).await
    }
}
