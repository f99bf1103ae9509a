//! Domain error model.
//!
//! Pure crates (geofence, inventory, orders) fail with [`DomainError`];
//! `teashop-infra` maps it onto the checkout taxonomy. The message text is
//! shown to admins and logged, never to customers, who get localized copy.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input: out-of-range coordinates, zero quantities, empty names.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A rule the data itself must keep, e.g. a status step that skips ahead
    /// or a compensation that does not match its deduction.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A product or order id that does not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A uniqueness rule lost a race (same order deducted twice).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
