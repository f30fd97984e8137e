//! Persisted runtime state access.
//!
//! # Responsibility
//! - Provide typed accessors over the `runtime_state` key-value table:
//!   active zone set, previous ringer mode, pending-capture flag,
//!   notification dedupe record.
//! - Keep all services off the backing table; this trait is the only
//!   path to shared mutable persisted state.
//!
//! # Invariants
//! - Writes are synchronous; once a setter returns, the value is
//!   durable relative to the caller's critical section.
//! - Corrupt persisted values surface as `StateError::InvalidData`,
//!   never as a silently empty read.

use crate::db::DbError;
use crate::model::zone::{RingerMode, ZoneId};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

const KEY_ACTIVE_ZONE_IDS: &str = "active_zone_ids";
const KEY_PREV_RINGER_MODE: &str = "prev_ringer_mode";
const KEY_INSIDE_ANY_ZONE: &str = "inside_any_zone";
const KEY_LAST_NOTIFY_KEY: &str = "last_notify_key";
const KEY_LAST_NOTIFY_AT_MS: &str = "last_notify_at_ms";

pub type StateResult<T> = Result<T, StateError>;

/// Error for runtime-state reads and writes.
#[derive(Debug)]
pub enum StateError {
    Db(DbError),
    InvalidData(String),
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
        }
    }
}

impl Error for StateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StateError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StateError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Typed access to the persisted runtime state.
pub trait StateStore: Send + Sync {
    /// IDs of zones the device is currently considered inside.
    fn active_zone_ids(&self) -> StateResult<BTreeSet<ZoneId>>;
    fn set_active_zone_ids(&self, ids: &BTreeSet<ZoneId>) -> StateResult<()>;

    /// Ringer mode captured before entering any zone, if a capture is
    /// pending. `inside_any_zone` is the pending-capture flag.
    fn previous_mode(&self) -> StateResult<Option<RingerMode>>;
    fn set_previous_mode(&self, mode: RingerMode) -> StateResult<()>;

    fn inside_any_zone(&self) -> StateResult<bool>;
    fn set_inside_any_zone(&self, inside: bool) -> StateResult<()>;

    /// Last shown notification `(key, shown_at_ms)` for dedupe.
    fn last_notification(&self) -> StateResult<Option<(String, i64)>>;
    fn set_last_notification(&self, key: &str, at_ms: i64) -> StateResult<()>;

    /// Cold-start reset: clears the active zone set and the pending
    /// previous-mode capture. Zone definitions are untouched.
    fn reset_presence_state(&self) -> StateResult<()>;
}

/// `StateStore` over the `runtime_state` SQLite table.
#[derive(Clone)]
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, key: &str) -> StateResult<Option<String>> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT value FROM runtime_state WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StateResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO runtime_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> StateResult<()> {
        let conn = self.lock();
        for key in keys {
            conn.execute("DELETE FROM runtime_state WHERE key = ?1;", [key])?;
        }
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn active_zone_ids(&self) -> StateResult<BTreeSet<ZoneId>> {
        match self.read(KEY_ACTIVE_ZONE_IDS)? {
            None => Ok(BTreeSet::new()),
            Some(raw) => parse_id_set(&raw),
        }
    }

    fn set_active_zone_ids(&self, ids: &BTreeSet<ZoneId>) -> StateResult<()> {
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.write(KEY_ACTIVE_ZONE_IDS, &joined)
    }

    fn previous_mode(&self) -> StateResult<Option<RingerMode>> {
        match self.read(KEY_PREV_RINGER_MODE)? {
            None => Ok(None),
            Some(raw) => parse_ringer_mode(&raw).map(Some),
        }
    }

    fn set_previous_mode(&self, mode: RingerMode) -> StateResult<()> {
        self.write(KEY_PREV_RINGER_MODE, ringer_mode_to_db(mode))
    }

    fn inside_any_zone(&self) -> StateResult<bool> {
        match self.read(KEY_INSIDE_ANY_ZONE)?.as_deref() {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(other) => Err(StateError::InvalidData(format!(
                "invalid inside_any_zone value `{other}`"
            ))),
        }
    }

    fn set_inside_any_zone(&self, inside: bool) -> StateResult<()> {
        self.write(KEY_INSIDE_ANY_ZONE, if inside { "1" } else { "0" })
    }

    fn last_notification(&self) -> StateResult<Option<(String, i64)>> {
        let Some(key) = self.read(KEY_LAST_NOTIFY_KEY)? else {
            return Ok(None);
        };
        let at_ms = match self.read(KEY_LAST_NOTIFY_AT_MS)? {
            None => 0,
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                StateError::InvalidData(format!("invalid last_notify_at_ms value `{raw}`"))
            })?,
        };
        Ok(Some((key, at_ms)))
    }

    fn set_last_notification(&self, key: &str, at_ms: i64) -> StateResult<()> {
        self.write(KEY_LAST_NOTIFY_KEY, key)?;
        self.write(KEY_LAST_NOTIFY_AT_MS, &at_ms.to_string())
    }

    fn reset_presence_state(&self) -> StateResult<()> {
        self.remove(&[
            KEY_ACTIVE_ZONE_IDS,
            KEY_PREV_RINGER_MODE,
            KEY_INSIDE_ANY_ZONE,
        ])
    }
}

fn parse_id_set(raw: &str) -> StateResult<BTreeSet<ZoneId>> {
    let mut ids = BTreeSet::new();
    for part in raw.split(',').filter(|part| !part.is_empty()) {
        let id = part.parse::<ZoneId>().map_err(|_| {
            StateError::InvalidData(format!("invalid zone id `{part}` in active_zone_ids"))
        })?;
        ids.insert(id);
    }
    Ok(ids)
}

fn ringer_mode_to_db(mode: RingerMode) -> &'static str {
    match mode {
        RingerMode::Normal => "normal",
        RingerMode::Vibrate => "vibrate",
        RingerMode::Silent => "silent",
    }
}

fn parse_ringer_mode(value: &str) -> StateResult<RingerMode> {
    match value {
        "normal" => Ok(RingerMode::Normal),
        "vibrate" => Ok(RingerMode::Vibrate),
        "silent" => Ok(RingerMode::Silent),
        other => Err(StateError::InvalidData(format!(
            "invalid prev_ringer_mode value `{other}`"
        ))),
    }
}
