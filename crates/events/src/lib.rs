//! Fulfillment events and the publish boundary used to hand them off.
//!
//! Events are published only after the state they describe is durable
//! (an order row, a committed ledger entry). Consumers are best-effort.

pub mod bus;
pub mod event;
pub mod fulfillment;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use fulfillment::{FulfillmentEvent, LowStock, OrderCreated, OrderCreatedLine};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
