//! Order persistence.
//!
//! An order row is written once, whole, and afterwards only `status` and
//! `updated_at` change. Status updates are conditional on the status the
//! caller read, so two racing transitions cannot both apply.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use teashop_core::{DomainError, OrderId};
use teashop_orders::{Order, OrderStatus};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("order {0} already exists")]
    Duplicate(OrderId),

    #[error("order not found")]
    NotFound,

    #[error("order status changed concurrently: expected {expected}, found {found}")]
    StaleStatus {
        expected: OrderStatus,
        found: OrderStatus,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Single atomic insert of the full order record.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Move `id` from `from` to `to` only if its stored status is still `from`.
    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError>;
}

#[async_trait]
impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        (**self).insert(order).await
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        (**self).get(id).await
    }

    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        (**self).update_status(id, from, to, at).await
    }
}
