//! Orders domain module.
//!
//! This crate contains business rules for storefront orders: checkout intent
//! validation, the immutable order record with its price/name snapshots, and
//! the status state machine. Pure domain logic (no IO, no HTTP, no storage).

pub mod checkout;
pub mod order;
pub mod status;

pub use checkout::{
    CheckoutIntent, CheckoutLine, CheckoutRejected, CheckoutRequest, CheckoutRequestItem,
    CustomerDetails, FieldIssue, IssueCode, MAX_LINE_QUANTITY,
};
pub use order::{CustomerSnapshot, LineItem, Order, PaymentMethod};
pub use status::OrderStatus;
