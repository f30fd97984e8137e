use std::collections::BTreeSet;
use zonesilent_core::{zone_request_id, GeoPoint, RingerMode, StateStore, ZoneMode};

mod common;
use common::{add_zone, harness};

const CENTER: GeoPoint = GeoPoint {
    latitude: 41.0,
    longitude: 29.0,
};

#[test]
fn malformed_transition_ids_are_dropped() {
    let h = harness();
    add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.monitor.on_transition(
        &["GEOFENCE_1".to_string(), "ZONE_abc".to_string()],
        &["".to_string()],
    );

    assert!(h.state.active_zone_ids().unwrap().is_empty());
    assert_eq!(h.audio.write_count(), 0);
    assert!(h.sink.shown().is_empty());
}

#[test]
fn valid_ids_survive_alongside_malformed_ones() {
    let h = harness();
    let z = add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.monitor
        .on_transition(&[zone_request_id(z), "junk".to_string()], &[]);

    assert_eq!(h.state.active_zone_ids().unwrap(), BTreeSet::from([z]));
    assert_eq!(h.audio.current_mode(), RingerMode::Vibrate);
}

#[test]
fn poll_entry_then_transition_exit_round_trip() {
    let h = harness();
    let z = add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.clock.set(100_000);
    h.monitor.on_poll_result(CENTER);
    assert_eq!(h.audio.current_mode(), RingerMode::Vibrate);
    assert!(h.state.inside_any_zone().unwrap());

    h.clock.set(110_000);
    h.monitor.on_transition(&[], &[zone_request_id(z)]);
    assert_eq!(h.audio.current_mode(), RingerMode::Normal);
    assert!(!h.state.inside_any_zone().unwrap());
    assert!(h.state.active_zone_ids().unwrap().is_empty());
}

#[test]
fn poll_unavailable_leaves_state_untouched() {
    let h = harness();
    let z = add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.clock.set(100_000);
    h.monitor.on_transition(&[zone_request_id(z)], &[]);
    let active_before = h.state.active_zone_ids().unwrap();
    let writes_before = h.audio.write_count();

    // Transient GPS loss must not clear presence or flap the mode.
    h.monitor.on_poll_unavailable();
    assert_eq!(h.state.active_zone_ids().unwrap(), active_before);
    assert_eq!(h.audio.write_count(), writes_before);
}

#[test]
fn cold_start_reset_clears_presence_state() {
    let h = harness();
    let z = add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.clock.set(100_000);
    h.monitor.on_transition(&[zone_request_id(z)], &[]);
    assert!(h.state.inside_any_zone().unwrap());

    h.monitor.reset_presence_state().unwrap();
    assert!(h.state.active_zone_ids().unwrap().is_empty());
    assert!(!h.state.inside_any_zone().unwrap());
    assert_eq!(h.state.previous_mode().unwrap(), None);
}

#[test]
fn next_poll_corrects_mode_after_cold_start_reset() {
    let h = harness();
    add_zone(&h.zones, "library", CENTER, 100.0, ZoneMode::Vibrate);

    h.clock.set(100_000);
    h.monitor.on_poll_result(CENTER);
    assert_eq!(h.audio.current_mode(), RingerMode::Vibrate);

    // Process restart while inside the zone.
    h.monitor.reset_presence_state().unwrap();

    h.clock.set(110_000);
    h.monitor.on_poll_result(CENTER);
    assert_eq!(h.audio.current_mode(), RingerMode::Vibrate);
    assert!(h.state.inside_any_zone().unwrap());
    // The capture after reset records the in-zone mode; the intentional
    // cold-start tradeoff accepts this until the user leaves the zone.
    assert_eq!(h.state.previous_mode().unwrap(), Some(RingerMode::Vibrate));
}
