//! Shared fakes and wiring helpers for integration tests.
#![allow(dead_code)]

use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use zonesilent_core::db::open_db_in_memory;
use zonesilent_core::{
    AudioError, AudioSystem, Clock, GeoPoint, NotificationSink, RingerMode, SqliteStateStore,
    SqliteZoneRepository, Zone, ZoneId, ZoneMode, ZoneMonitor, ZoneRepository,
};

/// In-memory audio subsystem with scriptable permission and failure
/// behavior.
pub struct FakeAudio {
    mode: Mutex<RingerMode>,
    dnd_access: AtomicBool,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<RingerMode>>,
}

impl FakeAudio {
    pub fn new(mode: RingerMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            dnd_access: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
        })
    }

    pub fn set_dnd_access(&self, granted: bool) {
        self.dnd_access.store(granted, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overrides the reported mode without recording a write, as if the
    /// user changed it by hand.
    pub fn force_mode(&self, mode: RingerMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn current_mode(&self) -> RingerMode {
        *self.mode.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<RingerMode> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl AudioSystem for FakeAudio {
    fn ringer_mode(&self) -> Result<RingerMode, AudioError> {
        Ok(*self.mode.lock().unwrap())
    }

    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), AudioError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AudioError::Write {
                mode,
                message: "injected write failure".to_string(),
            });
        }
        *self.mode.lock().unwrap() = mode;
        self.writes.lock().unwrap().push(mode);
        Ok(())
    }

    fn has_dnd_access(&self) -> bool {
        self.dnd_access.load(Ordering::SeqCst)
    }
}

/// Records notifications instead of displaying them.
#[derive(Default)]
pub struct FakeSink {
    shown: Mutex<Vec<(String, String)>>,
    status: Mutex<Vec<String>>,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn status_updates(&self) -> Vec<String> {
        self.status.lock().unwrap().clone()
    }
}

impl NotificationSink for FakeSink {
    fn show(&self, title: &str, message: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn update_status(&self, text: &str) {
        self.status.lock().unwrap().push(text.to_string());
    }
}

/// Manually advanced wall clock.
pub struct FakeClock {
    now_ms: AtomicI64,
}

impl FakeClock {
    pub fn at(now_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(now_ms),
        })
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

pub type TestMonitor =
    ZoneMonitor<SqliteZoneRepository, SqliteStateStore, Arc<FakeAudio>, Arc<FakeSink>, Arc<FakeClock>>;

/// Fully wired monitor over an in-memory database plus handles to every
/// fake for assertions.
pub struct Harness {
    pub conn: Arc<Mutex<Connection>>,
    pub zones: SqliteZoneRepository,
    pub state: SqliteStateStore,
    pub audio: Arc<FakeAudio>,
    pub sink: Arc<FakeSink>,
    pub clock: Arc<FakeClock>,
    pub monitor: TestMonitor,
}

pub fn harness() -> Harness {
    let conn = Arc::new(Mutex::new(open_db_in_memory().unwrap()));
    let zones = SqliteZoneRepository::new(Arc::clone(&conn));
    let state = SqliteStateStore::new(Arc::clone(&conn));
    let audio = FakeAudio::new(RingerMode::Normal);
    let sink = FakeSink::new();
    let clock = FakeClock::at(100_000);
    let monitor = ZoneMonitor::new(
        zones.clone(),
        state.clone(),
        Arc::clone(&audio),
        Arc::clone(&sink),
        Arc::clone(&clock),
    );
    Harness {
        conn,
        zones,
        state,
        audio,
        sink,
        clock,
        monitor,
    }
}

/// Inserts a zone and returns its assigned ID.
pub fn add_zone(
    zones: &SqliteZoneRepository,
    name: &str,
    center: GeoPoint,
    radius_m: f64,
    mode: ZoneMode,
) -> ZoneId {
    zones
        .insert(&Zone::new(name, center, radius_m, mode))
        .unwrap()
}

/// A fix well inside a zone centered at `center`.
pub fn inside(center: GeoPoint) -> GeoPoint {
    center
}

/// A fix roughly 10 km away from `center`, outside any test zone.
pub fn far_from(center: GeoPoint) -> GeoPoint {
    GeoPoint::new(center.latitude + 0.1, center.longitude)
}
