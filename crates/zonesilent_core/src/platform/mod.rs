//! Platform collaborator contracts.
//!
//! # Responsibility
//! - Define the seams the host platform must implement: audio
//!   subsystem access, notification display, wall-clock time.
//! - Keep core logic free of any platform SDK types.
//!
//! # Invariants
//! - Notification display is fire-and-forget; implementations swallow
//!   platform delivery errors and log them locally.

use crate::model::zone::RingerMode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Failure while talking to the platform audio subsystem.
///
/// Permission denial is NOT an error: `AudioSystem::has_dnd_access`
/// gates silent mode up front, and denied silent requests fall back to
/// vibrate. This type covers transient read/write failures only.
#[derive(Debug)]
pub enum AudioError {
    Read(String),
    Write { mode: RingerMode, message: String },
}

impl Display for AudioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(message) => write!(f, "failed to read ringer mode: {message}"),
            Self::Write { mode, message } => {
                write!(f, "failed to set ringer mode to {mode}: {message}")
            }
        }
    }
}

impl Error for AudioError {}

/// System audio subsystem access.
///
/// Implemented by the embedding app over the platform audio manager.
pub trait AudioSystem: Send + Sync {
    /// Reads the current system ringer mode.
    fn ringer_mode(&self) -> Result<RingerMode, AudioError>;

    /// Writes the system ringer mode.
    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), AudioError>;

    /// Whether the platform grants forcing fully silent mode.
    fn has_dnd_access(&self) -> bool;
}

/// User-facing notification output.
///
/// Both calls are fire-and-forget; the core never consumes a result.
pub trait NotificationSink: Send + Sync {
    /// Posts a one-shot notification.
    fn show(&self, title: &str, message: &str);

    /// Replaces the ongoing status line (foreground monitoring text).
    fn update_status(&self, text: &str);
}

impl<T: AudioSystem + ?Sized> AudioSystem for Arc<T> {
    fn ringer_mode(&self) -> Result<RingerMode, AudioError> {
        (**self).ringer_mode()
    }

    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), AudioError> {
        (**self).set_ringer_mode(mode)
    }

    fn has_dnd_access(&self) -> bool {
        (**self).has_dnd_access()
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn show(&self, title: &str, message: &str) {
        (**self).show(title, message)
    }

    fn update_status(&self, text: &str) {
        (**self).update_status(text)
    }
}

/// Wall-clock source, injectable so time-window logic is testable.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// `Clock` backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}
