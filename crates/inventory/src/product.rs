use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use teashop_core::{City, DomainError, DomainResult, Entity, ProductId};

/// Catalog product.
///
/// `stock_by_city` is a read-side view filled in from the inventory ledger;
/// catalog edits never write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    /// Price in smallest currency unit (halalas).
    unit_price: u64,
    #[serde(default)]
    stock_by_city: BTreeMap<City, i64>,
}

impl Product {
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: u64,
    ) -> DomainResult<Self> {
        let sku = sku.into();
        let name = name.into();

        if sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if unit_price == 0 {
            return Err(DomainError::validation("unit_price must be positive"));
        }

        Ok(Self {
            id,
            sku: sku.trim().to_string(),
            name: name.trim().to_string(),
            unit_price,
            stock_by_city: BTreeMap::new(),
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn stock_by_city(&self) -> &BTreeMap<City, i64> {
        &self.stock_by_city
    }

    pub fn stock_in(&self, city: City) -> i64 {
        self.stock_by_city.get(&city).copied().unwrap_or(0)
    }

    /// Attach the current per-city stock view.
    pub fn with_stock(mut self, stock_by_city: BTreeMap<City, i64>) -> Self {
        self.stock_by_city = stock_by_city;
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
