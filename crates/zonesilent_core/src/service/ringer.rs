//! Ringer-mode capture, apply and restore.
//!
//! # Responsibility
//! - Capture the mode the device had before entering any zone, exactly
//!   once per outside-to-inside edge.
//! - Apply the in-zone mode behind the Do Not Disturb permission gate,
//!   falling back to vibrate when the gate is closed.
//! - Restore the captured mode on exit.
//!
//! # Invariants
//! - `capture_if_needed` is idempotent while a capture is pending.
//! - A denied permission is reported via `ApplyOutcome::fallback`,
//!   never as an error.
//! - `restore` clears the pending-capture flag even when the audio
//!   write fails; a stuck flag would block every future capture.
//! - Every successful audio write stamps the echo suppressor before
//!   returning.

use crate::model::zone::{RingerMode, ZoneMode};
use crate::platform::{AudioError, AudioSystem};
use crate::repo::state_store::{StateError, StateStore};
use crate::service::echo::EchoSuppressor;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ControlResult<T> = Result<T, ControlError>;

/// Error for mode-control operations.
///
/// `Audio` covers transient platform write/read failures only; callers
/// log them and rely on the next reconciliation to retry.
#[derive(Debug)]
pub enum ControlError {
    State(StateError),
    Audio(AudioError),
}

impl Display for ControlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State(err) => write!(f, "{err}"),
            Self::Audio(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::State(err) => Some(err),
            Self::Audio(err) => Some(err),
        }
    }
}

impl From<StateError> for ControlError {
    fn from(value: StateError) -> Self {
        Self::State(value)
    }
}

impl From<AudioError> for ControlError {
    fn from(value: AudioError) -> Self {
        Self::Audio(value)
    }
}

/// Result of applying an in-zone mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Mode actually written to the audio subsystem.
    pub applied: RingerMode,
    /// True when silent was requested but Do Not Disturb access was
    /// missing and vibrate was substituted.
    pub fallback: bool,
}

/// Owns previous-mode capture/restore and all audio subsystem writes.
pub struct RingerModeController<S: StateStore, A: AudioSystem> {
    state: S,
    audio: A,
    echo: Arc<EchoSuppressor>,
}

impl<S: StateStore, A: AudioSystem> RingerModeController<S, A> {
    pub fn new(state: S, audio: A, echo: Arc<EchoSuppressor>) -> Self {
        Self { state, audio, echo }
    }

    /// Captures the current system mode as the previous mode, unless a
    /// capture is already pending.
    ///
    /// Must run before any `apply` on the same outside-to-inside edge
    /// so the stored mode is the one that existed outside any zone,
    /// never one this controller set itself.
    ///
    /// Returns `true` when a capture actually happened.
    pub fn capture_if_needed(&self) -> ControlResult<bool> {
        if self.state.inside_any_zone()? {
            return Ok(false);
        }

        let current = self.audio.ringer_mode()?;
        self.state.set_previous_mode(current)?;
        self.state.set_inside_any_zone(true)?;
        info!("event=mode_captured module=ringer status=ok previous={current}");
        Ok(true)
    }

    /// Applies the in-zone mode derived from the active zone set.
    ///
    /// Silent requests without Do Not Disturb access degrade to
    /// vibrate and report `fallback = true`; that path never errors,
    /// even when the vibrate write itself fails.
    pub fn apply(&self, desired: ZoneMode, now_ms: i64) -> ControlResult<ApplyOutcome> {
        let target = RingerMode::from(desired);

        if target == RingerMode::Silent && !self.audio.has_dnd_access() {
            warn!("event=mode_apply module=ringer status=fallback reason=dnd_access_missing");
            match self.audio.set_ringer_mode(RingerMode::Vibrate) {
                Ok(()) => self.echo.note_self_write(now_ms),
                Err(err) => {
                    error!("event=mode_apply module=ringer status=error mode=vibrate error={err}");
                }
            }
            return Ok(ApplyOutcome {
                applied: RingerMode::Vibrate,
                fallback: true,
            });
        }

        self.audio.set_ringer_mode(target)?;
        self.echo.note_self_write(now_ms);
        info!("event=mode_apply module=ringer status=ok mode={target}");
        Ok(ApplyOutcome {
            applied: target,
            fallback: false,
        })
    }

    /// Restores the previous mode and clears the pending capture.
    ///
    /// The flag is cleared before the audio write: an inconsistent
    /// system mode self-heals on the next reconciliation, a stuck
    /// pending-capture flag does not.
    pub fn restore(&self, now_ms: i64) -> ControlResult<RingerMode> {
        let previous = match self.state.previous_mode() {
            Ok(Some(mode)) => mode,
            Ok(None) => RingerMode::Normal,
            Err(err) => {
                warn!("event=mode_restore module=ringer status=degraded error={err}");
                RingerMode::Normal
            }
        };

        self.state.set_inside_any_zone(false)?;

        self.audio.set_ringer_mode(previous)?;
        self.echo.note_self_write(now_ms);
        info!("event=mode_restore module=ringer status=ok mode={previous}");
        Ok(previous)
    }
}
