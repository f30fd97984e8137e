//! Zone repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `zones` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Zone::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking
//!   it.

use crate::db::DbError;
use crate::model::zone::{GeoPoint, Zone, ZoneId, ZoneMode, ZoneValidationError};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

const ZONE_SELECT_SQL: &str = "SELECT id, name, latitude, longitude, radius_m, mode FROM zones";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for zone persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ZoneValidationError),
    Db(DbError),
    NotFound(ZoneId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "zone not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted zone data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ZoneValidationError> for RepoError {
    fn from(value: ZoneValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read/write interface over the zone store.
///
/// The reconciliation core only uses the read half (`list_all`,
/// `list_by_ids`); the write half exists for the embedding app's zone
/// management surface.
pub trait ZoneRepository: Send + Sync {
    fn list_all(&self) -> RepoResult<Vec<Zone>>;
    fn list_by_ids(&self, ids: &[ZoneId]) -> RepoResult<Vec<Zone>>;
    fn get(&self, id: ZoneId) -> RepoResult<Option<Zone>>;
    fn insert(&self, zone: &Zone) -> RepoResult<ZoneId>;
    fn update(&self, zone: &Zone) -> RepoResult<()>;
    fn delete(&self, id: ZoneId) -> RepoResult<()>;
}

/// SQLite-backed zone repository.
///
/// Holds a shared connection handle so the repository and the state
/// store can live over one database file; cloning is cheap.
#[derive(Clone)]
pub struct SqliteZoneRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteZoneRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ZoneRepository for SqliteZoneRepository {
    fn list_all(&self) -> RepoResult<Vec<Zone>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("{ZONE_SELECT_SQL} ORDER BY id DESC;"))?;
        let mut rows = stmt.query([])?;

        let mut zones = Vec::new();
        while let Some(row) = rows.next()? {
            zones.push(parse_zone_row(row)?);
        }
        Ok(zones)
    }

    fn list_by_ids(&self, ids: &[ZoneId]) -> RepoResult<Vec<Zone>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "{ZONE_SELECT_SQL} WHERE id IN ({placeholders}) ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;

        let mut zones = Vec::new();
        while let Some(row) = rows.next()? {
            zones.push(parse_zone_row(row)?);
        }
        Ok(zones)
    }

    fn get(&self, id: ZoneId) -> RepoResult<Option<Zone>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("{ZONE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;

        if let Some(row) = rows.next()? {
            return Ok(Some(parse_zone_row(row)?));
        }
        Ok(None)
    }

    fn insert(&self, zone: &Zone) -> RepoResult<ZoneId> {
        zone.validate()?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO zones (name, latitude, longitude, radius_m, mode)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                zone.name.as_str(),
                zone.center.latitude,
                zone.center.longitude,
                zone.radius_m,
                zone_mode_to_db(zone.mode),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, zone: &Zone) -> RepoResult<()> {
        zone.validate()?;

        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE zones
             SET
                name = ?1,
                latitude = ?2,
                longitude = ?3,
                radius_m = ?4,
                mode = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6;",
            params![
                zone.name.as_str(),
                zone.center.latitude,
                zone.center.longitude,
                zone.radius_m,
                zone_mode_to_db(zone.mode),
                zone.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(zone.id));
        }
        Ok(())
    }

    fn delete(&self, id: ZoneId) -> RepoResult<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM zones WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_zone_row(row: &Row<'_>) -> RepoResult<Zone> {
    let mode_text: String = row.get("mode")?;
    let mode = parse_zone_mode(&mode_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid zone mode `{mode_text}` in zones.mode"))
    })?;

    let zone = Zone {
        id: row.get("id")?,
        name: row.get("name")?,
        center: GeoPoint {
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
        },
        radius_m: row.get("radius_m")?,
        mode,
    };
    zone.validate()?;
    Ok(zone)
}

fn zone_mode_to_db(mode: ZoneMode) -> &'static str {
    match mode {
        ZoneMode::Silent => "silent",
        ZoneMode::Vibrate => "vibrate",
    }
}

fn parse_zone_mode(value: &str) -> Option<ZoneMode> {
    match value {
        "silent" => Some(ZoneMode::Silent),
        "vibrate" => Some(ZoneMode::Vibrate),
        _ => None,
    }
}
