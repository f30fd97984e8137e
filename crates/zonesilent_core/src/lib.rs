//! Core domain logic for ZoneSilent.
//! This crate is the single source of truth for zone-presence
//! reconciliation and ringer-mode control invariants.

pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod platform;
pub mod repo;
pub mod service;

pub use geo::presence::{haversine_distance_m, zones_containing};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::zone::{
    desired_mode, GeoPoint, RingerMode, Zone, ZoneId, ZoneMode, ZoneValidationError,
    MIN_ZONE_RADIUS_M,
};
pub use platform::{AudioError, AudioSystem, Clock, NotificationSink, SystemClock};
pub use repo::state_store::{SqliteStateStore, StateError, StateResult, StateStore};
pub use repo::zone_repo::{RepoError, RepoResult, SqliteZoneRepository, ZoneRepository};
pub use service::echo::{EchoSuppressor, ECHO_WINDOW_MS};
pub use service::monitor::{parse_zone_request_id, zone_request_id, ZoneMonitor};
pub use service::notify::{
    NotificationPresenter, NotifyKind, StatusLine, NOTIFY_DEDUPE_WINDOW_MS,
};
pub use service::ringer::{ApplyOutcome, ControlError, ControlResult, RingerModeController};
pub use service::tracker::{
    ActiveZoneSetTracker, ModeAction, ReconcileOutcome, TrackerError, TrackerResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
