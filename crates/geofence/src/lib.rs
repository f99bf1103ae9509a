//! Geofencing and free-delivery eligibility (pure, no IO).
//!
//! One named-region registry answers "which city is this point in?" for both
//! the eligibility calculator and order validation, so the two can never
//! disagree about a boundary.

pub mod coordinates;
pub mod distance;
pub mod eligibility;
pub mod region;

pub use coordinates::LatLng;
pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use eligibility::{
    DeliveryEligibility, EligibilityPolicy, FLAT_DELIVERY_FEE, FREE_DELIVERY_RADIUS_KM,
    LocationInput, MIN_PACKS_CITY, MIN_PACKS_NEAR, ReasonCode, UnsupportedLocation, Warehouse,
};
pub use region::{BoundingBox, Region, RegionRegistry};
