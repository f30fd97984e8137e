//! Point-in-zone membership via haversine distance.
//!
//! # Responsibility
//! - Compute great-circle distance between two fixes.
//! - Map a location fix to the set of zones containing it.
//!
//! # Invariants
//! - Evaluation is pure: no I/O, no side effects.
//! - A fix exactly on the boundary (`distance == radius`) is inside.

use crate::model::zone::{GeoPoint, Zone, ZoneId};
use std::collections::BTreeSet;

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two fixes in meters.
///
/// Haversine is accurate to well under a meter at zone-radius scale,
/// which is all the membership test needs.
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Returns the IDs of all zones whose region contains `location`.
pub fn zones_containing(location: GeoPoint, zones: &[Zone]) -> BTreeSet<ZoneId> {
    zones
        .iter()
        .filter(|zone| haversine_distance_m(location, zone.center) <= zone.radius_m)
        .map(|zone| zone.id)
        .collect()
}
