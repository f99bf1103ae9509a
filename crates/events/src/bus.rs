//! Event publishing abstraction (mechanics only).
//!
//! The bus is the **hand-off point** between the checkout critical path and
//! everything that reacts to it (customer notifications, admin alerts).
//!
//! ## Delivery semantics
//!
//! - Publish happens only after the fact is durable (order row written).
//! - Delivery is best-effort: a failed publish is logged by the caller and
//!   never turns a successful checkout into a failed one.
//! - Consumers must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to an in-process event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created. Tests drain it after a checkout to see what was announced.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Fire-and-forget publish boundary.
///
/// `publish` must not block on downstream work: implementations enqueue and
/// return. The error only reports that the hand-off itself failed (queue
/// closed, lock poisoned), never that a consumer failed.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }
}
