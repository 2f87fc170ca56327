//! The decision engine
//!
//! Turns noisy periodic power samples into a monotonic, idempotent,
//! crash-recoverable shutdown decision. State is the set of persisted
//! markers, read back every tick so elapsed-time math stays anchored to the
//! original onset across process restarts:
//!
//! - Idle: no markers, on AC
//! - OnBatteryWaiting: `BatteryOnset` set, `ShutdownIssued` absent
//! - ShutdownTriggered: `ShutdownIssued` set, survives until reset
//! - AcRestoreDebounce: `AcRestoreOnset` set while an episode is pending
//!
//! The engine is a pure transition function: inputs are pre-read, mutations
//! and dispatch requests are returned for the scheduler to apply. Nothing in
//! here performs I/O or fails.

use mains_config::Config;
use mains_host_api::{PowerSample, PowerSource};
use mains_store::{MarkerKind, MarkerView};
use mains_util::{TargetId, Timestamp};
use std::time::Duration;

use crate::{DispatchReason, EngineEvent};

/// Marker mutations requested by a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerMutation {
    Set(MarkerKind, Timestamp),
    Clear(MarkerKind),

    /// Full reset: the three decision markers and the per-target issued set
    /// go together, never partially
    ClearEpisode,
}

/// Request to (re)notify targets of an episode-terminating event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub reason: DispatchReason,

    /// Configured targets not yet issued this episode, in config order
    pub targets: Vec<TargetId>,
}

/// What one tick decided
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub mutations: Vec<MarkerMutation>,
    pub dispatch: Option<DispatchRequest>,
    pub events: Vec<EngineEvent>,
}

/// The decision engine
pub struct DecisionEngine {
    low_battery: u8,
    grace: Duration,
    ac_stable: Duration,
    targets: Vec<TargetId>,
}

impl DecisionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            low_battery: config.low_battery,
            grace: config.grace,
            ac_stable: config.ac_stable,
            targets: config.target_ids(),
        }
    }

    /// Run one tick of the state machine.
    pub fn tick(&self, view: &MarkerView, sample: PowerSample, now: Timestamp) -> TickOutcome {
        let mut out = TickOutcome::default();

        match sample.source {
            PowerSource::Battery => self.tick_battery(view, sample, now, &mut out),
            PowerSource::Ac => self.tick_ac(view, now, &mut out),
        }

        out
    }

    /// Configured targets not yet issued this episode, in config order
    fn pending_targets(&self, view: &MarkerView) -> Vec<TargetId> {
        self.targets
            .iter()
            .filter(|t| !view.issued_targets.contains(t))
            .cloned()
            .collect()
    }

    fn tick_battery(
        &self,
        view: &MarkerView,
        sample: PowerSample,
        now: Timestamp,
        out: &mut TickOutcome,
    ) {
        // A return to battery invalidates any stability countdown
        // immediately; partial AC restoration must not count toward the
        // stability requirement.
        if view.ac_restore_onset.is_some() {
            out.mutations
                .push(MarkerMutation::Clear(MarkerKind::AcRestoreOnset));
            if view.episode_pending() {
                out.events.push(EngineEvent::StabilityInterrupted);
            }
        }

        // Critical bypass: an emergency, not a debounced event. Skips the
        // grace-period logic entirely, whatever the marker state.
        if sample.percent < self.low_battery {
            let pending = self.pending_targets(view);
            if !pending.is_empty() {
                out.events.push(EngineEvent::CriticalBattery {
                    percent: sample.percent,
                });
                out.dispatch = Some(DispatchRequest {
                    reason: DispatchReason::CriticalBattery,
                    targets: pending,
                });
            }
            return;
        }

        match view.battery_onset {
            None => {
                // Episode begins
                out.mutations
                    .push(MarkerMutation::Set(MarkerKind::BatteryOnset, now));
                out.events.push(EngineEvent::EnteredBattery {
                    percent: sample.percent,
                    grace: self.grace,
                });
            }
            Some(onset) => {
                let elapsed = now.since(onset);
                if elapsed >= self.grace {
                    let pending = self.pending_targets(view);
                    if !pending.is_empty() {
                        out.events.push(EngineEvent::GraceExpired { elapsed });
                        out.dispatch = Some(DispatchRequest {
                            reason: DispatchReason::GraceExpired,
                            targets: pending,
                        });
                    }
                } else {
                    out.events.push(EngineEvent::GraceCountdown {
                        remaining: self.grace - elapsed,
                    });
                }
            }
        }
    }

    fn tick_ac(&self, view: &MarkerView, now: Timestamp, out: &mut TickOutcome) {
        if !view.episode_pending() {
            // Idle state is always marker-clean
            if view.ac_restore_onset.is_some() {
                out.mutations
                    .push(MarkerMutation::Clear(MarkerKind::AcRestoreOnset));
                out.events.push(EngineEvent::StrayMarkerCleared);
            }
            return;
        }

        match view.ac_restore_onset {
            None => {
                out.mutations
                    .push(MarkerMutation::Set(MarkerKind::AcRestoreOnset, now));
                out.events.push(EngineEvent::AcRestored {
                    stability: self.ac_stable,
                });

                // A zero stability window collapses set-and-check into an
                // immediate reset on the same tick.
                if self.ac_stable.is_zero() {
                    out.mutations.push(MarkerMutation::ClearEpisode);
                    out.events.push(EngineEvent::EpisodeCancelled {
                        stable: Duration::ZERO,
                    });
                }
            }
            Some(onset) => {
                let stable = now.since(onset);
                if stable >= self.ac_stable {
                    out.mutations.push(MarkerMutation::ClearEpisode);
                    out.events.push(EngineEvent::EpisodeCancelled { stable });
                } else {
                    out.events.push(EngineEvent::StabilityCountdown {
                        remaining: self.ac_stable - stable,
                    });
                }
            }
        }
    }
}
