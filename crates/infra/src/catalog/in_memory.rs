use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use teashop_core::ProductId;
use teashop_inventory::Product;

use super::{CatalogError, ProductCatalog};

#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Storage("lock poisoned".to_string()))?;
        Ok(products.get(&id).cloned())
    }

    async fn upsert(&self, product: Product) -> Result<(), CatalogError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| CatalogError::Storage("lock poisoned".to_string()))?;
        let id = product.id_typed();
        if products
            .values()
            .any(|p| p.id_typed() != id && p.sku() == product.sku())
        {
            return Err(CatalogError::DuplicateSku(product.sku().to_string()));
        }
        products.insert(id, product);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_and_rejects_foreign_sku() {
        let catalog = InMemoryProductCatalog::new();
        let id = ProductId::new();
        catalog
            .upsert(Product::new(id, "TEA-OOL", "Oolong", 4500).unwrap())
            .await
            .unwrap();
        catalog
            .upsert(Product::new(id, "TEA-OOL", "Oolong Reserve", 5200).unwrap())
            .await
            .unwrap();

        let stored = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(stored.name(), "Oolong Reserve");
        assert_eq!(stored.unit_price(), 5200);

        let other = Product::new(ProductId::new(), "TEA-OOL", "Copy", 100).unwrap();
        assert!(matches!(
            catalog.upsert(other).await,
            Err(CatalogError::DuplicateSku(_))
        ));
        assert!(catalog.get(ProductId::new()).await.unwrap().is_none());
    }
}
