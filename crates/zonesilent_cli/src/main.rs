//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `zonesilent_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use zonesilent_core::{haversine_distance_m, GeoPoint};

fn main() {
    println!("zonesilent_core version={}", zonesilent_core::core_version());

    let istanbul = GeoPoint::new(41.0082, 28.9784);
    let ankara = GeoPoint::new(39.9334, 32.8597);
    println!(
        "istanbul->ankara distance_km={:.1}",
        haversine_distance_m(istanbul, ankara) / 1_000.0
    );
}
