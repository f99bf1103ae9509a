use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use teashop_core::OrderId;
use teashop_orders::{Order, OrderStatus};

use super::{OrderRepository, RepositoryError};

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let id = order.id_typed();
        if orders.contains_key(id) {
            return Err(RepositoryError::Duplicate(id.clone()));
        }
        orders.insert(id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if order.status() != from {
            return Err(RepositoryError::StaleStatus {
                expected: from,
                found: order.status(),
            });
        }
        order.transition(to, at)?;
        Ok(order.clone())
    }
}
