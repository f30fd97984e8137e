//! Self-write echo suppression for ringer-mode observations.
//!
//! The platform broadcasts every ringer-mode change, including the ones
//! this crate performs itself. Reacting to those echoes would re-apply
//! the mode and broadcast again, looping forever. Each self-write is
//! stamped here; observations landing inside the window after the stamp
//! are dropped as echoes.
//!
//! # Invariants
//! - State is process-lifetime only; it is never persisted.
//! - An observation is an echo iff it arrives strictly less than
//!   `window_ms` after the last self-write.

use std::sync::atomic::{AtomicI64, Ordering};

/// Default suppression window after a self-write.
pub const ECHO_WINDOW_MS: i64 = 1_000;

/// Sentinel for "no self-write has happened yet".
const NEVER: i64 = i64::MIN;

/// Tagged-write log with expiry: one timestamp, checked by the
/// mode-change listener before reacting.
#[derive(Debug)]
pub struct EchoSuppressor {
    window_ms: i64,
    last_self_write_at_ms: AtomicI64,
}

impl EchoSuppressor {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            last_self_write_at_ms: AtomicI64::new(NEVER),
        }
    }

    /// Records that this crate just wrote the ringer mode.
    pub fn note_self_write(&self, now_ms: i64) {
        self.last_self_write_at_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Whether an externally observed mode change at `observed_at_ms`
    /// should be ignored as an echo of our own write.
    pub fn should_ignore(&self, observed_at_ms: i64) -> bool {
        let last = self.last_self_write_at_ms.load(Ordering::SeqCst);
        if last == NEVER {
            return false;
        }
        observed_at_ms.saturating_sub(last) < self.window_ms
    }
}

impl Default for EchoSuppressor {
    fn default() -> Self {
        Self::new(ECHO_WINDOW_MS)
    }
}
