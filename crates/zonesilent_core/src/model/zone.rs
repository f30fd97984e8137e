//! Zone domain model and system audio mode types.
//!
//! # Responsibility
//! - Define the canonical zone record (circular region + desired mode).
//! - Define the system ringer mode enum and desired-mode derivation.
//!
//! # Invariants
//! - `radius_m` is never below `MIN_ZONE_RADIUS_M`.
//! - Desired mode is derived from the active zones, never stored.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for a zone (SQLite rowid).
pub type ZoneId = i64;

/// Smallest zone radius the platform region monitor handles reliably.
pub const MIN_ZONE_RADIUS_M: f64 = 50.0;

/// Audio behavior a zone requests while the device is inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneMode {
    /// Fully silent; requires Do Not Disturb access on the platform.
    Silent,
    /// Vibrate only; always applicable.
    Vibrate,
}

/// System-wide ringer mode as reported/set via the audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingerMode {
    Normal,
    Vibrate,
    Silent,
}

impl Display for RingerMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Vibrate => "vibrate",
            Self::Silent => "silent",
        };
        write!(f, "{name}")
    }
}

impl From<ZoneMode> for RingerMode {
    fn from(value: ZoneMode) -> Self {
        match value {
            ZoneMode::Silent => Self::Silent,
            ZoneMode::Vibrate => Self::Vibrate,
        }
    }
}

/// A latitude/longitude fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// User-defined circular geographic region with an associated audio mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Stable ID assigned by storage; `0` means not yet persisted.
    pub id: ZoneId,
    /// Display name shown in status text and notifications.
    pub name: String,
    pub center: GeoPoint,
    /// Region radius in meters. Must be >= `MIN_ZONE_RADIUS_M`.
    pub radius_m: f64,
    /// Mode applied while the device is inside this zone.
    pub mode: ZoneMode,
}

/// Validation failures for zone records.
#[derive(Debug, PartialEq)]
pub enum ZoneValidationError {
    EmptyName,
    RadiusTooSmall { radius_m: f64 },
    LatitudeOutOfRange { latitude: f64 },
    LongitudeOutOfRange { longitude: f64 },
}

impl Display for ZoneValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "zone name cannot be empty"),
            Self::RadiusTooSmall { radius_m } => write!(
                f,
                "zone radius {radius_m}m is below the minimum of {MIN_ZONE_RADIUS_M}m"
            ),
            Self::LatitudeOutOfRange { latitude } => {
                write!(f, "latitude {latitude} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange { longitude } => {
                write!(f, "longitude {longitude} is outside [-180, 180]")
            }
        }
    }
}

impl Error for ZoneValidationError {}

impl Zone {
    /// Creates an unpersisted zone (`id = 0`).
    pub fn new(name: impl Into<String>, center: GeoPoint, radius_m: f64, mode: ZoneMode) -> Self {
        Self {
            id: 0,
            name: name.into(),
            center,
            radius_m,
            mode,
        }
    }

    /// Checks geometry and naming invariants.
    ///
    /// Write paths must call this before any SQL mutation.
    pub fn validate(&self) -> Result<(), ZoneValidationError> {
        if self.name.trim().is_empty() {
            return Err(ZoneValidationError::EmptyName);
        }
        if !self.radius_m.is_finite() || self.radius_m < MIN_ZONE_RADIUS_M {
            return Err(ZoneValidationError::RadiusTooSmall {
                radius_m: self.radius_m,
            });
        }
        if !self.center.latitude.is_finite() || self.center.latitude.abs() > 90.0 {
            return Err(ZoneValidationError::LatitudeOutOfRange {
                latitude: self.center.latitude,
            });
        }
        if !self.center.longitude.is_finite() || self.center.longitude.abs() > 180.0 {
            return Err(ZoneValidationError::LongitudeOutOfRange {
                longitude: self.center.longitude,
            });
        }
        Ok(())
    }
}

/// Derives the in-zone target mode from the zones the device is inside.
///
/// Silent wins over vibrate whenever at least one active zone requests
/// it, independent of iteration order. Returns `None` for an empty
/// slice; the caller restores the previous mode instead.
pub fn desired_mode(active_zones: &[Zone]) -> Option<ZoneMode> {
    if active_zones.is_empty() {
        return None;
    }
    if active_zones.iter().any(|zone| zone.mode == ZoneMode::Silent) {
        Some(ZoneMode::Silent)
    } else {
        Some(ZoneMode::Vibrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(mode: ZoneMode) -> Zone {
        Zone::new("library", GeoPoint::new(41.0, 29.0), 100.0, mode)
    }

    #[test]
    fn validate_rejects_small_radius() {
        let mut z = zone(ZoneMode::Silent);
        z.radius_m = 10.0;
        assert_eq!(
            z.validate(),
            Err(ZoneValidationError::RadiusTooSmall { radius_m: 10.0 })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let mut z = zone(ZoneMode::Vibrate);
        z.center.latitude = 91.0;
        assert!(matches!(
            z.validate(),
            Err(ZoneValidationError::LatitudeOutOfRange { .. })
        ));

        let mut z = zone(ZoneMode::Vibrate);
        z.center.longitude = -180.5;
        assert!(matches!(
            z.validate(),
            Err(ZoneValidationError::LongitudeOutOfRange { .. })
        ));
    }

    #[test]
    fn desired_mode_prefers_silent_regardless_of_order() {
        let silent = zone(ZoneMode::Silent);
        let vibrate = zone(ZoneMode::Vibrate);

        let forward = vec![vibrate.clone(), silent.clone()];
        let backward = vec![silent, vibrate];
        assert_eq!(desired_mode(&forward), Some(ZoneMode::Silent));
        assert_eq!(desired_mode(&backward), Some(ZoneMode::Silent));
    }

    #[test]
    fn desired_mode_is_vibrate_without_silent_zones() {
        let zones = vec![zone(ZoneMode::Vibrate), zone(ZoneMode::Vibrate)];
        assert_eq!(desired_mode(&zones), Some(ZoneMode::Vibrate));
        assert_eq!(desired_mode(&[]), None);
    }

    #[test]
    fn zone_serializes_with_snake_case_mode() {
        let z = zone(ZoneMode::Silent);
        let json = serde_json::to_string(&z).unwrap();
        assert!(json.contains("\"mode\":\"silent\""));
    }
}
