use serde::{Deserialize, Serialize};

use teashop_core::{City, DomainError, DomainResult};

use crate::coordinates::LatLng;

/// Axis-aligned lat/lng box, bounds inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lng <= other.max_lng
            && other.min_lng <= self.max_lng
    }
}

pub const RIYADH_BOUNDS: BoundingBox = BoundingBox::new(24.40, 25.10, 46.40, 47.00);
pub const JEDDAH_BOUNDS: BoundingBox = BoundingBox::new(21.30, 21.80, 39.05, 39.30);

/// A named serviceable region.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub city: City,
    pub bounds: BoundingBox,
}

impl Region {
    pub fn contains(&self, point: LatLng) -> bool {
        self.bounds.contains(point)
    }
}

/// Registry of serviceable regions.
///
/// Regions must be pairwise disjoint; a point belongs to a city only when it
/// falls inside exactly one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    pub fn new(regions: Vec<Region>) -> DomainResult<Self> {
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                if a.city == b.city {
                    return Err(DomainError::validation(format!(
                        "city {} registered twice",
                        a.city
                    )));
                }
                if a.bounds.intersects(&b.bounds) {
                    return Err(DomainError::invariant(format!(
                        "regions {} and {} overlap",
                        a.city, b.city
                    )));
                }
            }
        }
        Ok(Self { regions })
    }

    /// Riyadh and Jeddah.
    pub fn serviceable() -> Self {
        Self {
            regions: vec![
                Region {
                    city: City::Riyadh,
                    bounds: RIYADH_BOUNDS,
                },
                Region {
                    city: City::Jeddah,
                    bounds: JEDDAH_BOUNDS,
                },
            ],
        }
    }

    /// The city whose region contains `point`, if exactly one does.
    pub fn resolve(&self, point: LatLng) -> Option<City> {
        let mut hits = self.regions.iter().filter(|r| r.contains(point));
        match (hits.next(), hits.next()) {
            (Some(region), None) => Some(region.city),
            _ => None,
        }
    }

    pub fn region(&self, city: City) -> Option<&Region> {
        self.regions.iter().find(|r| r.city == city)
    }

    pub fn is_serviceable(&self, city: City) -> bool {
        self.region(city).is_some()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::serviceable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    #[test]
    fn resolves_points_inside_each_city() {
        let registry = RegionRegistry::serviceable();
        assert_eq!(registry.resolve(p(24.7136, 46.6753)), Some(City::Riyadh));
        assert_eq!(registry.resolve(p(21.4858, 39.1925)), Some(City::Jeddah));
    }

    #[test]
    fn points_outside_every_box_resolve_to_nothing() {
        let registry = RegionRegistry::serviceable();
        assert_eq!(registry.resolve(p(26.4207, 50.0888)), None); // Dammam
        assert_eq!(registry.resolve(p(0.0, 0.0)), None);
    }

    #[test]
    fn bounds_are_inclusive() {
        let registry = RegionRegistry::serviceable();
        assert_eq!(
            registry.resolve(p(RIYADH_BOUNDS.min_lat, RIYADH_BOUNDS.max_lng)),
            Some(City::Riyadh)
        );
    }

    #[test]
    fn overlapping_regions_are_rejected() {
        let err = RegionRegistry::new(vec![
            Region {
                city: City::Riyadh,
                bounds: BoundingBox::new(0.0, 2.0, 0.0, 2.0),
            },
            Region {
                city: City::Jeddah,
                bounds: BoundingBox::new(1.0, 3.0, 1.0, 3.0),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn default_regions_are_disjoint() {
        assert!(!RIYADH_BOUNDS.intersects(&JEDDAH_BOUNDS));
        assert!(RegionRegistry::new(RegionRegistry::serviceable().regions().to_vec()).is_ok());
    }
}
