use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use teashop_core::ProductId;
use teashop_inventory::Product;

use super::{CatalogError, ProductCatalog};
use crate::db;

#[derive(Debug, Clone)]
pub struct PostgresProductCatalog {
    pool: Arc<PgPool>,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CatalogError {
    CatalogError::Storage(db::describe(operation, &err))
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    #[instrument(skip(self), err)]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query("SELECT sku, name, unit_price FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let sku: String = row.try_get("sku").map_err(|e| map_sqlx_error("get_product", e))?;
        let name: String = row.try_get("name").map_err(|e| map_sqlx_error("get_product", e))?;
        let unit_price: i64 = row
            .try_get("unit_price")
            .map_err(|e| map_sqlx_error("get_product", e))?;
        let unit_price = u64::try_from(unit_price)
            .map_err(|_| CatalogError::Storage(format!("negative unit_price for {id}")))?;

        Product::new(id, sku, name, unit_price)
            .map(Some)
            .map_err(|e| CatalogError::Storage(format!("invalid product row {id}: {e}")))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn upsert(&self, product: Product) -> Result<(), CatalogError> {
        let unit_price = i64::try_from(product.unit_price())
            .map_err(|_| CatalogError::Storage("unit_price out of range".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, unit_price, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (id)
            DO UPDATE SET sku = EXCLUDED.sku,
                          name = EXCLUDED.name,
                          unit_price = EXCLUDED.unit_price,
                          updated_at = NOW()
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.sku())
        .bind(product.name())
        .bind(unit_price)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                CatalogError::DuplicateSku(product.sku().to_string())
            } else {
                map_sqlx_error("upsert_product", e)
            }
        })?;
        Ok(())
    }
}
