//! Great-circle distance from the warehouse and the shipping tier it falls in.

use crate::config::{PricingConfig, Warehouse};
use crate::model::{Location, ShippingQuote, ShippingTier};

/// Haversine distance between two points, on a sphere of the given radius.
///
/// The intermediate term is clamped into `[0, 1]` so rounding can never push
/// `sqrt` or `atan2` out of their domain: identical points give exactly `0.0`
/// and antipodal points give `π × radius`.
pub fn haversine(from: (f64, f64), to: (f64, f64), radius: f64) -> f64 {
    let (lat1, lng1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lng2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    radius * c
}

#[derive(Debug, Clone)]
pub struct GeoPricer {
    origin: Warehouse,
    pricing: PricingConfig,
}

impl GeoPricer {
    pub fn new(origin: Warehouse, pricing: PricingConfig) -> Self {
        Self { origin, pricing }
    }

    /// Prices a shipment. Without coordinates the flat default cost applies.
    pub fn price(&self, location: Option<&Location>) -> ShippingQuote {
        let Some(location) = location else {
            return self.quote(self.pricing.default_cost, ShippingTier::Flat, None);
        };

        let distance = self.distance_to(location);
        let (cost, tier) = self.tier_for_distance(distance);
        tracing::debug!(distance, cost, ?tier, "Priced shipment");
        self.quote(cost, tier, Some(distance))
    }

    /// Distance from the warehouse in the configured unit.
    pub fn distance_to(&self, location: &Location) -> f64 {
        haversine(
            (self.origin.lat, self.origin.lng),
            (location.lat, location.lng),
            self.pricing.unit.earth_radius(),
        )
    }

    /// First tier whose inclusive bound covers `distance`.
    pub fn tier_for_distance(&self, distance: f64) -> (f64, ShippingTier) {
        self.pricing
            .tiers
            .iter()
            .find(|t| t.up_to.map_or(true, |bound| distance <= bound))
            .map(|t| (t.cost, t.tier))
            // A validated config always ends with an unbounded tier
            .unwrap_or((self.pricing.default_cost, ShippingTier::Flat))
    }

    fn quote(&self, cost: f64, tier: ShippingTier, distance: Option<f64>) -> ShippingQuote {
        ShippingQuote {
            cost,
            tier,
            distance,
            estimated_delivery: self.pricing.delivery.for_tier(tier).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistanceUnit, PipelineConfig};
    use std::f64::consts::PI;

    fn pricer() -> GeoPricer {
        let config = PipelineConfig::default();
        GeoPricer::new(config.warehouse, config.pricing)
    }

    fn at(lat: f64, lng: f64) -> Location {
        Location {
            lat,
            lng,
            accuracy: None,
        }
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        let pricer = pricer();
        assert_eq!(pricer.tier_for_distance(0.0), (5.00, ShippingTier::Local));
        assert_eq!(pricer.tier_for_distance(5.000), (5.00, ShippingTier::Local));
        assert_eq!(pricer.tier_for_distance(5.001), (9.99, ShippingTier::Regional));
        assert_eq!(pricer.tier_for_distance(15.000), (9.99, ShippingTier::Regional));
        assert_eq!(pricer.tier_for_distance(15.001), (14.99, ShippingTier::LongHaul));
        assert_eq!(pricer.tier_for_distance(12_000.0), (14.99, ShippingTier::LongHaul));
    }

    #[test]
    fn test_identical_points_are_zero() {
        assert_eq!(haversine((40.7128, -74.0060), (40.7128, -74.0060), 3959.0), 0.0);
        assert_eq!(haversine((-33.9, 151.2), (-33.9, 151.2), 6371.0), 0.0);
    }

    #[test]
    fn test_antipodal_points_are_half_circumference() {
        let miles = haversine((0.0, 0.0), (0.0, 180.0), 3959.0);
        assert!((miles - PI * 3959.0).abs() < 1e-6);

        let km = haversine((90.0, 0.0), (-90.0, 0.0), 6371.0);
        assert!((km - PI * 6371.0).abs() < 1e-6);
    }

    #[test]
    fn test_new_york_example_is_local() {
        let quote = pricer().price(Some(&at(40.7306, -73.9352)));
        let distance = quote.distance.unwrap();
        assert!(distance > 3.5 && distance < 5.0, "distance {distance}");
        assert_eq!(quote.cost, 5.00);
        assert_eq!(quote.tier, ShippingTier::Local);
        assert_eq!(quote.estimated_delivery, "1-2 business days");
    }

    #[test]
    fn test_missing_location_uses_flat_cost() {
        let quote = pricer().price(None);
        assert_eq!(quote.cost, 7.99);
        assert_eq!(quote.tier, ShippingTier::Flat);
        assert_eq!(quote.distance, None);
    }

    #[test]
    fn test_kilometers_change_the_tier() {
        let mut config = PipelineConfig::default();
        config.pricing.unit = DistanceUnit::Kilometers;
        let pricer = GeoPricer::new(config.warehouse, config.pricing);

        // ~3.9 miles is ~6.3 km
        let quote = pricer.price(Some(&at(40.7306, -73.9352)));
        assert_eq!(quote.tier, ShippingTier::Regional);
    }

    #[test]
    fn test_far_away_is_long_haul() {
        // Los Angeles
        let quote = pricer().price(Some(&at(34.0522, -118.2437)));
        assert_eq!(quote.cost, 14.99);
        assert!(quote.distance.unwrap() > 2000.0);
    }
}
