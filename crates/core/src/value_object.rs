//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Coordinates, line-item
/// snapshots and customer snapshots are value objects: once an order captures them they
/// never change, even if the catalog entry they were copied from is edited later.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct LatLng { lat: f64, lng: f64 }
///
/// impl ValueObject for LatLng {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
