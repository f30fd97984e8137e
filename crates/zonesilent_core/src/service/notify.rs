//! Rate-limited, deduplicated user-facing notifications.
//!
//! Two distinct presentation policies live here and must not be
//! merged:
//! - `NotificationPresenter::maybe_show` — one-shot notifications,
//!   entry-only, persisted key + cooldown dedupe.
//! - `StatusLine::update` — the ongoing foreground status text, pure
//!   content-based dedupe with no cooldown.
//!
//! # Invariants
//! - Zone-exit events are never surfaced as one-shot notifications.
//! - An identical one-shot key is never shown twice inside the
//!   cooldown window.

use crate::platform::NotificationSink;
use crate::repo::state_store::{StateResult, StateStore};
use log::debug;
use std::sync::{Mutex, PoisonError};

/// Cooldown for repeating an identical one-shot notification.
pub const NOTIFY_DEDUPE_WINDOW_MS: i64 = 30_000;

/// What a one-shot notification is about. Drives the surfacing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    ZoneEntry,
    /// Deliberately not surfaced; exits are visible through the mode
    /// change itself and would otherwise double notification volume.
    ZoneExit,
    PermissionWarning,
}

/// One-shot notification output with persisted dedupe state.
pub struct NotificationPresenter<S: StateStore, N: NotificationSink> {
    state: S,
    sink: N,
}

impl<S: StateStore, N: NotificationSink> NotificationPresenter<S, N> {
    pub fn new(state: S, sink: N) -> Self {
        Self { state, sink }
    }

    /// Shows a one-shot notification unless policy or dedupe suppresses
    /// it. Returns whether the notification was emitted.
    pub fn maybe_show(
        &self,
        kind: NotifyKind,
        title: &str,
        message: &str,
        now_ms: i64,
    ) -> StateResult<bool> {
        if kind == NotifyKind::ZoneExit {
            debug!("event=notify_suppressed module=notify status=ok reason=exit_event");
            return Ok(false);
        }

        let key = format!("{title}|{message}");
        if let Some((last_key, last_at_ms)) = self.state.last_notification()? {
            if last_key == key && now_ms.saturating_sub(last_at_ms) < NOTIFY_DEDUPE_WINDOW_MS {
                debug!("event=notify_suppressed module=notify status=ok reason=dedupe_window");
                return Ok(false);
            }
        }

        self.state.set_last_notification(&key, now_ms)?;
        self.sink.show(title, message);
        Ok(true)
    }
}

/// Ongoing status text with content-based dedupe.
///
/// The last text lives in memory only; after a process restart the
/// first update always goes through, which is what a fresh foreground
/// notification needs anyway.
pub struct StatusLine<N: NotificationSink> {
    sink: N,
    last_text: Mutex<Option<String>>,
}

impl<N: NotificationSink> StatusLine<N> {
    pub fn new(sink: N) -> Self {
        Self {
            sink,
            last_text: Mutex::new(None),
        }
    }

    /// Pushes the status text when it differs from the last shown one.
    /// Returns whether the sink was invoked.
    pub fn update(&self, text: &str) -> bool {
        let mut last = self
            .last_text
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == Some(text) {
            return false;
        }
        *last = Some(text.to_string());
        self.sink.update_status(text);
        true
    }
}
