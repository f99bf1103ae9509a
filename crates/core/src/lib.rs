//! `teashop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the serviceable city set, and the domain error model.

pub mod city;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use city::City;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId};
pub use value_object::ValueObject;
