//! Authoritative active-zone-set tracking and reconciliation.
//!
//! Two unreliable presence sources feed this component: boundary
//! transition events (incremental, may be delayed or missed) and
//! periodic location polls (absolute snapshots, trusted wholesale so
//! drift never accumulates). Both funnel into the same reconciliation
//! tail, so exactly one code path derives the ringer mode from
//! presence.
//!
//! # Invariants
//! - Every read-merge-persist sequence runs under one lock; the two
//!   sources can never interleave a read and a write of the set.
//! - The persisted set is re-read at the start of each critical
//!   section, so a superseded in-flight computation is never applied
//!   over newer state.
//! - Zone IDs that no longer resolve in the store are pruned on every
//!   reconciliation; deletion-while-inside is an expected condition.
//! - Zone-store failures degrade to "no active zones" rather than
//!   leaving the device silent indefinitely.

use crate::model::zone::{desired_mode, RingerMode, Zone, ZoneId, ZoneMode};
use crate::platform::AudioSystem;
use crate::repo::state_store::{StateError, StateStore};
use crate::repo::zone_repo::ZoneRepository;
use crate::service::ringer::{ApplyOutcome, ControlError, RingerModeController};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Error surfaced from a reconciliation run.
#[derive(Debug)]
pub enum TrackerError {
    State(StateError),
    Control(ControlError),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State(err) => write!(f, "{err}"),
            Self::Control(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::State(err) => Some(err),
            Self::Control(err) => Some(err),
        }
    }
}

impl From<StateError> for TrackerError {
    fn from(value: StateError) -> Self {
        Self::State(value)
    }
}

impl From<ControlError> for TrackerError {
    fn from(value: ControlError) -> Self {
        Self::Control(value)
    }
}

/// What a reconciliation run did to the ringer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    /// Set emptied; the previous mode was restored.
    Restored(RingerMode),
    /// Set nonempty; the derived in-zone mode was applied.
    Applied { mode: RingerMode, fallback: bool },
}

/// Result of one reconciliation run, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Active zone set after merging and stale pruning.
    pub active: BTreeSet<ZoneId>,
    /// True when this run crossed the outside-to-inside edge.
    pub entered_zone: bool,
    pub action: ModeAction,
}

/// Owns the authoritative "currently inside" zone set.
pub struct ActiveZoneSetTracker<Z, S, A>
where
    Z: ZoneRepository,
    S: StateStore,
    A: AudioSystem,
{
    zones: Z,
    state: S,
    controller: RingerModeController<S, A>,
    // Single critical section for both presence sources (see module doc).
    reconcile_lock: Mutex<()>,
}

impl<Z, S, A> ActiveZoneSetTracker<Z, S, A>
where
    Z: ZoneRepository,
    S: StateStore,
    A: AudioSystem,
{
    pub fn new(zones: Z, state: S, controller: RingerModeController<S, A>) -> Self {
        Self {
            zones,
            state,
            controller,
            reconcile_lock: Mutex::new(()),
        }
    }

    /// Merges a boundary-crossing event into the active set.
    ///
    /// Transition events are incremental: `entering` is added to and
    /// `exiting` removed from whatever the persisted set holds now.
    pub fn apply_transition(
        &self,
        entering: &[ZoneId],
        exiting: &[ZoneId],
        now_ms: i64,
    ) -> TrackerResult<ReconcileOutcome> {
        let _guard = self
            .reconcile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.read_active_or_empty();
        let was_empty = current.is_empty();

        let mut next = current;
        next.extend(entering.iter().copied());
        for id in exiting {
            next.remove(id);
        }
        self.state.set_active_zone_ids(&next)?;
        debug!(
            "event=transition_merged module=tracker status=ok entering={} exiting={} active={}",
            entering.len(),
            exiting.len(),
            next.len()
        );

        self.reconcile(was_empty, next, now_ms)
    }

    /// Replaces the active set with an absolute poll snapshot.
    ///
    /// The poll is the correctness backstop: its membership result is
    /// trusted wholesale, discarding whatever the incremental events
    /// accumulated.
    pub fn apply_poll(
        &self,
        now_inside: &BTreeSet<ZoneId>,
        now_ms: i64,
    ) -> TrackerResult<ReconcileOutcome> {
        let _guard = self
            .reconcile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let was_empty = self.read_active_or_empty().is_empty();
        self.state.set_active_zone_ids(now_inside)?;
        debug!(
            "event=poll_snapshot module=tracker status=ok active={}",
            now_inside.len()
        );

        self.reconcile(was_empty, now_inside.clone(), now_ms)
    }

    /// Resolves the mode currently desired by the active set, or `None`
    /// when the device is outside all zones.
    pub fn current_desired_mode(&self) -> TrackerResult<Option<ZoneMode>> {
        let _guard = self
            .reconcile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.current_desired_mode_locked()
    }

    /// Re-applies the currently desired mode, used by the external
    /// mode-change listener after a genuine divergence.
    ///
    /// Returns `None` without touching the audio subsystem when the
    /// device is outside all zones.
    pub fn reapply_desired(&self, now_ms: i64) -> TrackerResult<Option<ApplyOutcome>> {
        let _guard = self
            .reconcile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.current_desired_mode_locked()? {
            None => Ok(None),
            Some(desired) => {
                let outcome = self.controller.apply(desired, now_ms)?;
                Ok(Some(outcome))
            }
        }
    }

    /// Shared reconciliation tail for both presence sources.
    ///
    /// `was_empty` is the emptiness of the set before this run's merge,
    /// used to detect the outside-to-inside edge.
    fn reconcile(
        &self,
        was_empty: bool,
        active: BTreeSet<ZoneId>,
        now_ms: i64,
    ) -> TrackerResult<ReconcileOutcome> {
        if active.is_empty() {
            let restored = self.controller.restore(now_ms)?;
            return Ok(ReconcileOutcome {
                active,
                entered_zone: false,
                action: ModeAction::Restored(restored),
            });
        }

        // Stale-reference cleanup: re-resolve every ID on every run.
        let ids: Vec<ZoneId> = active.iter().copied().collect();
        let zones = match self.zones.list_by_ids(&ids) {
            Ok(zones) => zones,
            Err(err) => {
                error!("event=zone_resolve module=tracker status=error error={err}");
                Vec::new()
            }
        };

        let existing: BTreeSet<ZoneId> = zones.iter().map(|zone| zone.id).collect();
        let pruned: BTreeSet<ZoneId> = active.intersection(&existing).copied().collect();
        if pruned.len() != active.len() {
            warn!(
                "event=stale_pruned module=tracker status=ok removed={}",
                active.len() - pruned.len()
            );
            self.state.set_active_zone_ids(&pruned)?;
        }

        if pruned.is_empty() {
            let restored = self.controller.restore(now_ms)?;
            return Ok(ReconcileOutcome {
                active: pruned,
                entered_zone: false,
                action: ModeAction::Restored(restored),
            });
        }

        // Capture strictly before the first apply on this edge, so the
        // stored previous mode predates any write of our own.
        let entered_zone = was_empty;
        if entered_zone {
            self.controller.capture_if_needed()?;
        }

        let active_zones: Vec<Zone> = zones
            .into_iter()
            .filter(|zone| pruned.contains(&zone.id))
            .collect();
        let Some(desired) = desired_mode(&active_zones) else {
            let restored = self.controller.restore(now_ms)?;
            return Ok(ReconcileOutcome {
                active: pruned,
                entered_zone: false,
                action: ModeAction::Restored(restored),
            });
        };

        let outcome = self.controller.apply(desired, now_ms)?;
        info!(
            "event=reconciled module=tracker status=ok active={} mode={} fallback={}",
            pruned.len(),
            outcome.applied,
            outcome.fallback
        );
        Ok(ReconcileOutcome {
            active: pruned,
            entered_zone,
            action: ModeAction::Applied {
                mode: outcome.applied,
                fallback: outcome.fallback,
            },
        })
    }

    fn current_desired_mode_locked(&self) -> TrackerResult<Option<ZoneMode>> {
        if !self.state.inside_any_zone()? {
            return Ok(None);
        }

        let active = self.read_active_or_empty();
        if active.is_empty() {
            return Ok(None);
        }

        let ids: Vec<ZoneId> = active.iter().copied().collect();
        let zones = match self.zones.list_by_ids(&ids) {
            Ok(zones) => zones,
            Err(err) => {
                error!("event=zone_resolve module=tracker status=error error={err}");
                return Ok(None);
            }
        };
        Ok(desired_mode(&zones))
    }

    /// Reads the persisted set, degrading corrupt state to empty so the
    /// device fails toward restoring normal operation.
    fn read_active_or_empty(&self) -> BTreeSet<ZoneId> {
        match self.state.active_zone_ids() {
            Ok(ids) => ids,
            Err(err) => {
                warn!("event=state_read module=tracker status=degraded error={err}");
                BTreeSet::new()
            }
        }
    }
}
