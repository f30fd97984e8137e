//! Presence-source adapters and the mode-change listener.
//!
//! # Responsibility
//! - Translate raw platform inputs (string-encoded transition IDs,
//!   location fixes, ringer-mode broadcasts) into tracker calls.
//! - Drive user-facing output: one-shot notifications on the
//!   transition path, the ongoing status line on the polling path.
//!
//! # Invariants
//! - Malformed transition IDs are dropped, never treated as zones.
//! - No input path ever propagates a fatal error; everything degrades
//!   to logging and waits for the next reconciliation.
//! - Externally observed mode changes are only acted on outside the
//!   echo window, while inside a zone, and when the observed mode
//!   genuinely diverges from the desired one.

use crate::geo::presence::zones_containing;
use crate::model::zone::{GeoPoint, RingerMode, ZoneId};
use crate::platform::{AudioSystem, Clock, NotificationSink};
use crate::repo::state_store::{StateResult, StateStore};
use crate::repo::zone_repo::ZoneRepository;
use crate::service::echo::EchoSuppressor;
use crate::service::notify::{NotificationPresenter, NotifyKind, StatusLine};
use crate::service::ringer::RingerModeController;
use crate::service::tracker::{ActiveZoneSetTracker, ModeAction, ReconcileOutcome};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Prefix for string-encoded zone IDs in transition events.
pub const ZONE_REQUEST_ID_PREFIX: &str = "ZONE_";

const ENTRY_TITLE: &str = "ZoneSilent active";
const ENTRY_MESSAGE: &str = "Entered a quiet zone. Ringer switched to silent/vibrate.";
const EXIT_TITLE: &str = "ZoneSilent deactivated";
const EXIT_MESSAGE: &str = "Left the quiet zone. Ringer restored.";
const DND_WARNING_TITLE: &str = "ZoneSilent";
const DND_WARNING_MESSAGE: &str =
    "Silent mode needs Do Not Disturb access. Grant it in system settings.";

/// Encodes a zone ID for registration with the region-transition source.
pub fn zone_request_id(id: ZoneId) -> String {
    format!("{ZONE_REQUEST_ID_PREFIX}{id}")
}

/// Decodes a transition request ID back to a zone ID.
pub fn parse_zone_request_id(request_id: &str) -> Option<ZoneId> {
    request_id
        .strip_prefix(ZONE_REQUEST_ID_PREFIX)?
        .parse::<ZoneId>()
        .ok()
}

/// Entry point for both presence sources and the mode-change listener.
///
/// All state mutation goes through the owned tracker, so the two
/// sources share its single critical section.
pub struct ZoneMonitor<Z, S, A, N, C>
where
    Z: ZoneRepository + Clone,
    S: StateStore + Clone,
    A: AudioSystem,
    N: NotificationSink + Clone,
    C: Clock,
{
    zones: Z,
    state: S,
    tracker: ActiveZoneSetTracker<Z, S, A>,
    presenter: NotificationPresenter<S, N>,
    status: StatusLine<N>,
    echo: Arc<EchoSuppressor>,
    clock: C,
}

impl<Z, S, A, N, C> ZoneMonitor<Z, S, A, N, C>
where
    Z: ZoneRepository + Clone,
    S: StateStore + Clone,
    A: AudioSystem,
    N: NotificationSink + Clone,
    C: Clock,
{
    pub fn new(zones: Z, state: S, audio: A, sink: N, clock: C) -> Self {
        let echo = Arc::new(EchoSuppressor::default());
        let controller = RingerModeController::new(state.clone(), audio, Arc::clone(&echo));
        let tracker = ActiveZoneSetTracker::new(zones.clone(), state.clone(), controller);
        let presenter = NotificationPresenter::new(state.clone(), sink.clone());
        let status = StatusLine::new(sink);
        Self {
            zones,
            state,
            tracker,
            presenter,
            status,
            echo,
            clock,
        }
    }

    /// Cold-start reset: clears the persisted active set and pending
    /// previous-mode capture. The embedder calls this once at app
    /// initialization; the next poll corrects any resulting window
    /// where the device mode and actual presence disagree.
    pub fn reset_presence_state(&self) -> StateResult<()> {
        self.state.reset_presence_state()?;
        info!("event=presence_reset module=monitor status=ok");
        Ok(())
    }

    /// Handles a batched region-transition event from the platform.
    ///
    /// IDs arrive as `"ZONE_<id>"`; malformed entries are dropped with
    /// a warning.
    pub fn on_transition(&self, entering: &[String], exiting: &[String]) {
        let entering_ids = parse_request_ids(entering);
        let exiting_ids = parse_request_ids(exiting);
        if entering_ids.is_empty() && exiting_ids.is_empty() {
            warn!("event=transition module=monitor status=dropped reason=no_valid_ids");
            return;
        }

        let now_ms = self.clock.now_ms();
        match self
            .tracker
            .apply_transition(&entering_ids, &exiting_ids, now_ms)
        {
            Ok(outcome) => {
                if !entering_ids.is_empty() {
                    self.show_for(NotifyKind::ZoneEntry, ENTRY_TITLE, ENTRY_MESSAGE, now_ms);
                } else {
                    self.show_for(NotifyKind::ZoneExit, EXIT_TITLE, EXIT_MESSAGE, now_ms);
                }
                if fallback_fired(&outcome) {
                    self.show_for(
                        NotifyKind::PermissionWarning,
                        DND_WARNING_TITLE,
                        DND_WARNING_MESSAGE,
                        now_ms,
                    );
                }
            }
            Err(err) => {
                error!("event=transition module=monitor status=error error={err}");
            }
        }
    }

    /// Handles a periodic location fix from the polling source.
    ///
    /// Derives absolute zone membership and feeds it to the tracker,
    /// then refreshes the ongoing status line.
    pub fn on_poll_result(&self, location: GeoPoint) {
        let now_ms = self.clock.now_ms();

        let zones = match self.zones.list_all() {
            Ok(zones) => zones,
            Err(err) => {
                // Fail toward restoring normal operation, not silence.
                error!("event=poll module=monitor status=degraded error={err}");
                Vec::new()
            }
        };

        if zones.is_empty() {
            if let Err(err) = self.tracker.apply_poll(&BTreeSet::new(), now_ms) {
                error!("event=poll module=monitor status=error error={err}");
            }
            self.status.update("No zones configured");
            return;
        }

        let now_inside = zones_containing(location, &zones);
        match self.tracker.apply_poll(&now_inside, now_ms) {
            Ok(outcome) => self.update_status_line(&outcome),
            Err(err) => {
                error!("event=poll module=monitor status=error error={err}");
            }
        }
    }

    /// Handles a failed poll: location fix unobtainable or permission
    /// revoked mid-operation. Treated as "no new information"; clearing
    /// the set here would flap the mode on every transient GPS loss.
    pub fn on_poll_unavailable(&self) {
        warn!("event=poll module=monitor status=unavailable action=none");
    }

    /// Handles an externally observed ringer-mode change broadcast.
    pub fn on_ringer_mode_changed(&self, observed: RingerMode) {
        let now_ms = self.clock.now_ms();
        if self.echo.should_ignore(now_ms) {
            debug!("event=mode_observed module=monitor status=ignored reason=self_echo");
            return;
        }

        // Outside any zone every mode change is legitimate user intent.
        let inside = self.state.inside_any_zone().unwrap_or(false);
        if !inside {
            return;
        }

        let desired = match self.tracker.current_desired_mode() {
            Ok(Some(desired)) => desired,
            Ok(None) => return,
            Err(err) => {
                warn!("event=mode_observed module=monitor status=degraded error={err}");
                return;
            }
        };
        if observed == RingerMode::from(desired) {
            return;
        }

        info!("event=mode_observed module=monitor status=reapplying observed={observed}");
        if let Err(err) = self.tracker.reapply_desired(now_ms) {
            error!("event=mode_observed module=monitor status=error error={err}");
        }
    }

    fn update_status_line(&self, outcome: &ReconcileOutcome) {
        match outcome.action {
            ModeAction::Restored(_) => {
                self.status.update("Outside all zones");
            }
            ModeAction::Applied { mode, fallback } => {
                let count = outcome.active.len();
                let text = if fallback {
                    format!("Inside {count} zone(s), mode: {mode} (grant Do Not Disturb access)")
                } else {
                    format!("Inside {count} zone(s), mode: {mode}")
                };
                self.status.update(&text);
            }
        }
    }

    fn show_for(&self, kind: NotifyKind, title: &str, message: &str, now_ms: i64) {
        if let Err(err) = self.presenter.maybe_show(kind, title, message, now_ms) {
            error!("event=notify module=monitor status=error error={err}");
        }
    }
}

fn fallback_fired(outcome: &ReconcileOutcome) -> bool {
    matches!(outcome.action, ModeAction::Applied { fallback: true, .. })
}

fn parse_request_ids(request_ids: &[String]) -> Vec<ZoneId> {
    let mut ids = Vec::with_capacity(request_ids.len());
    for raw in request_ids {
        match parse_zone_request_id(raw) {
            Some(id) => ids.push(id),
            None => {
                warn!("event=transition module=monitor status=dropped_id raw={raw}");
            }
        }
    }
    ids
}
