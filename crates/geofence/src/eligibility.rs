//! Free-delivery eligibility calculator.
//!
//! Two independent rules, OR-ed together and reported in fixed priority:
//!
//! 1. near-warehouse: within [`FREE_DELIVERY_RADIUS_KM`] of the warehouse and at
//!    least [`MIN_PACKS_NEAR`] packs
//! 2. in-city: inside a serviceable city and at least [`MIN_PACKS_CITY`] packs
//!
//! The result is advisory for the storefront ("add N more") and authoritative
//! for the delivery fee charged on the order.

use serde::Serialize;
use thiserror::Error;

use teashop_core::City;

use crate::coordinates::LatLng;
use crate::distance::haversine_km;
use crate::region::RegionRegistry;

pub const FREE_DELIVERY_RADIUS_KM: f64 = 20.0;
pub const MIN_PACKS_NEAR: u32 = 3;
pub const MIN_PACKS_CITY: u32 = 5;
/// Flat fee for orders that do not qualify, in halalas (25 SAR).
pub const FLAT_DELIVERY_FEE: u64 = 2500;

/// The single fulfillment warehouse and the city whose stock it ships from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Warehouse {
    pub location: LatLng,
    pub city: City,
}

impl Default for Warehouse {
    fn default() -> Self {
        Self {
            location: LatLng {
                lat: 24.45,
                lng: 46.85,
            },
            city: City::Riyadh,
        }
    }
}

/// Where the customer wants delivery.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LocationInput {
    pub coordinates: Option<LatLng>,
    pub declared_city: Option<City>,
}

/// Why an order did or did not qualify.
///
/// Satisfied rules come first, in priority order; diagnostics follow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NearWarehouse,
    InCity,
    NeedMorePacks,
    OutsideWarehouseRadius,
    NoCoordinates,
    /// Coordinates resolved to a different city than the one declared.
    DeclaredCityOverridden,
}

impl ReasonCode {
    pub fn is_qualifying(self) -> bool {
        matches!(self, ReasonCode::NearWarehouse | ReasonCode::InCity)
    }
}

/// Outcome of an eligibility evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryEligibility {
    pub qualifies: bool,
    pub distance_km: Option<f64>,
    /// Serviceable city the location belongs to (from coordinates or declared).
    pub city: Option<City>,
    /// City whose stock will be used: `city`, or the warehouse's city when the
    /// location only matched the warehouse radius.
    pub fulfillment_city: City,
    pub total_packs: u32,
    pub reason_codes: Vec<ReasonCode>,
    /// Packs still needed for the nearest applicable rule; 0 when qualifying.
    pub shortfall: u32,
    pub delivery_fee: u64,
}

impl DeliveryEligibility {
    /// The rule reported to the customer: the first satisfied one.
    pub fn reason(&self) -> Option<ReasonCode> {
        self.reason_codes.iter().copied().find(|c| c.is_qualifying())
    }
}

/// The location is outside every serviceable city and the warehouse radius.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("delivery location is outside the serviceable area")]
pub struct UnsupportedLocation {
    pub coordinates: Option<LatLng>,
    pub distance_km: Option<f64>,
}

impl UnsupportedLocation {
    pub fn message_en(&self) -> &'static str {
        "We currently deliver only within Riyadh and Jeddah."
    }

    pub fn message_ar(&self) -> &'static str {
        "نقوم حالياً بالتوصيل داخل الرياض وجدة فقط."
    }
}

/// Parameters of the calculator. `Default` is the published storefront policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityPolicy {
    pub warehouse: Warehouse,
    pub radius_km: f64,
    pub min_packs_near: u32,
    pub min_packs_city: u32,
    pub flat_delivery_fee: u64,
    pub regions: RegionRegistry,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            warehouse: Warehouse::default(),
            radius_km: FREE_DELIVERY_RADIUS_KM,
            min_packs_near: MIN_PACKS_NEAR,
            min_packs_city: MIN_PACKS_CITY,
            flat_delivery_fee: FLAT_DELIVERY_FEE,
            regions: RegionRegistry::serviceable(),
        }
    }
}

impl EligibilityPolicy {
    pub fn evaluate(
        &self,
        input: &LocationInput,
        total_packs: u32,
    ) -> Result<DeliveryEligibility, UnsupportedLocation> {
        let resolved = input.coordinates.and_then(|p| self.regions.resolve(p));
        let declared = input
            .declared_city
            .filter(|c| self.regions.is_serviceable(*c));
        let distance_km = input
            .coordinates
            .map(|p| haversine_km(p, self.warehouse.location));
        let within_radius = distance_km.is_some_and(|d| d <= self.radius_km);

        // Inside the warehouse radius the coordinates locate the customer even
        // outside every box, so a declared city no longer decides anything.
        let located = resolved.or(within_radius.then_some(self.warehouse.city));
        let city = match resolved {
            Some(c) => Some(c),
            None if within_radius => None,
            None => declared,
        };

        if city.is_none() && !within_radius {
            return Err(UnsupportedLocation {
                coordinates: input.coordinates,
                distance_km,
            });
        }

        let near_rule = within_radius && total_packs >= self.min_packs_near;
        let city_rule = city.is_some() && total_packs >= self.min_packs_city;
        let qualifies = near_rule || city_rule;

        let mut reason_codes = Vec::new();
        if near_rule {
            reason_codes.push(ReasonCode::NearWarehouse);
        }
        if city_rule {
            reason_codes.push(ReasonCode::InCity);
        }
        if !qualifies {
            reason_codes.push(ReasonCode::NeedMorePacks);
        }
        match distance_km {
            None => reason_codes.push(ReasonCode::NoCoordinates),
            Some(_) if !within_radius => reason_codes.push(ReasonCode::OutsideWarehouseRadius),
            Some(_) => {}
        }
        if let (Some(l), Some(d)) = (located, input.declared_city) {
            if l != d {
                reason_codes.push(ReasonCode::DeclaredCityOverridden);
            }
        }

        let shortfall = if qualifies {
            0
        } else {
            let near_gap = within_radius
                .then(|| self.min_packs_near - total_packs.min(self.min_packs_near));
            let city_gap =
                city.map(|_| self.min_packs_city - total_packs.min(self.min_packs_city));
            near_gap.into_iter().chain(city_gap).min().unwrap_or(0)
        };

        let fulfillment_city = located.or(city).unwrap_or(self.warehouse.city);

        Ok(DeliveryEligibility {
            qualifies,
            distance_km,
            city,
            fulfillment_city,
            total_packs,
            reason_codes,
            shortfall,
            delivery_fee: if qualifies { 0 } else { self.flat_delivery_fee },
        })
    }
}
