//! Application service: the one entry point every caller shares.
//!
//! [`AppService`] wraps the [`StateStore`], the [`PhaseScheduler`] and the
//! [`Notifier`].  The hardware loop, the scheduler's timer callbacks and
//! every front-end submit events through [`AppService::submit`], so manual
//! and automatic control run the same code path and every accepted
//! transition gets its follow-up timer armed in one place.
//!
//! ```text
//!  HardwareLoop ──┐                 ┌──────────────────────────┐
//!  REST / MQTT ───┼──▶ submit() ──▶ │ StateStore::transition   │──▶ Notifier
//!  Timer fire ────┘                 └────────────┬─────────────┘
//!        ▲                                       │ accepted
//!        │                                       ▼
//!        └──────────── PhaseScheduler ◀── arm_for(new snapshot)
//! ```
//!
//! Cheap to clone: all clones share one core.

use std::sync::{Arc, Weak};

use log::{debug, info, warn};

use crate::adapters::analytics::DisposalLog;
use crate::config::SystemConfig;
use crate::error::{ClassificationFailure, Error};
use crate::events::{Event, PhaseEvent};
use crate::fsm::Phase;
use crate::fsm::context::{Classification, SystemSnapshot};
use crate::notifier::{Notifier, SubscriberId};
use crate::scheduler::PhaseScheduler;
use crate::sensors::{BinColor, SensorId};
use crate::store::{Rejected, StateStore, TransitionResult};

use super::commands::{AppCommand, CommandReply};
use super::ports::TransitionSink;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

struct ServiceCore {
    store: Arc<StateStore>,
    notifier: Arc<Notifier>,
    scheduler: PhaseScheduler,
    config: SystemConfig,
    analytics: DisposalLog,
}

#[derive(Clone)]
pub struct AppService {
    core: Arc<ServiceCore>,
}

impl AppService {
    pub fn new(
        store: Arc<StateStore>,
        notifier: Arc<Notifier>,
        scheduler: PhaseScheduler,
        config: SystemConfig,
        analytics: DisposalLog,
    ) -> Self {
        Self {
            core: Arc::new(ServiceCore {
                store,
                notifier,
                scheduler,
                config,
                analytics,
            }),
        }
    }

    // ── External interface ────────────────────────────────────

    /// Read-only copy of the current state.
    pub fn get_status(&self) -> SystemSnapshot {
        self.core.store.snapshot()
    }

    /// Manual equivalent of a physical sensor edge.
    ///
    /// A manual trigger is already a single edge, so it skips level
    /// tracking and goes straight to the shared sensor dispatch.
    pub fn trigger_sensor(&self, id: SensorId) -> TransitionResult {
        info!("Manual trigger: {}", id);
        self.dispatch_sensor(id)
    }

    /// Result from an external classifier.
    pub fn submit_classification_result(
        &self,
        bin_color: BinColor,
        confidence: f32,
    ) -> TransitionResult {
        match Classification::new(bin_color, confidence) {
            Ok(result) => self.submit(PhaseEvent::ClassificationReady(result).into()),
            Err(reason) => {
                warn!("Classification rejected: {}", reason);
                Err(Rejected {
                    reason,
                    snapshot: self.get_status(),
                })
            }
        }
    }

    /// Return to `idle` from any phase and disarm every pending timer.
    pub fn reset(&self) -> TransitionResult {
        self.core.scheduler.cancel_all();
        self.submit(PhaseEvent::ManualReset.into())
    }

    /// Register `sink` for every accepted transition from now on.
    pub fn subscribe(
        &self,
        name: &'static str,
        sink: impl TransitionSink + 'static,
    ) -> Result<SubscriberId, Error> {
        self.core.notifier.subscribe(name, sink)
    }

    /// Run one front-end command.
    pub fn handle_command(&self, cmd: AppCommand) -> CommandReply {
        match cmd {
            AppCommand::GetStatus => CommandReply::Status {
                state: self.get_status(),
            },
            AppCommand::TriggerSensor(id) => Self::reply(self.trigger_sensor(id)),
            AppCommand::SubmitClassification {
                bin_color,
                confidence,
            } => Self::reply(self.submit_classification_result(bin_color, confidence)),
            AppCommand::Reset => Self::reply(self.reset()),
            AppCommand::LastClassification => CommandReply::Classification {
                classification: self.core.analytics.last_classification(),
            },
            AppCommand::LastDisposal => CommandReply::Disposal {
                disposal: self.core.analytics.last_disposal(),
                totals: self.core.analytics.totals(),
            },
        }
    }

    // ── Shared event path ─────────────────────────────────────

    /// Latch `id` and submit the event its edge stands for.
    ///
    /// The intake sensor always means `object_detected`.  A bin sensor
    /// is judged against the pending classification of the snapshot it
    /// was read from and stamped with that generation.
    pub fn dispatch_sensor(&self, id: SensorId) -> TransitionResult {
        let event = match id.bin_color() {
            None => Event::new(PhaseEvent::ObjectDetected),
            Some(bin) => {
                let seen = self.get_status();
                let what = if seen.pending_matches(bin) {
                    PhaseEvent::CorrectBin(bin)
                } else {
                    PhaseEvent::WrongBin(bin)
                };
                Event::new(what).stamped(seen.generation)
            }
        };
        self.core.store.latch_sensor(id);
        self.submit(event.from_sensor(id))
    }

    /// Submit `event` and arm the follow-up timer of whatever phase it
    /// lands in.
    pub fn submit(&self, event: Event) -> TransitionResult {
        let applied = self.core.store.transition(event)?;
        self.arm_for(&applied.snapshot);
        Ok(applied)
    }

    fn arm_for(&self, state: &SystemSnapshot) {
        let config = &self.core.config;
        let (label, delay, what) = match state.phase {
            Phase::Processing => (
                "processing-deadline",
                config.processing_deadline(),
                PhaseEvent::ClassificationFailed(ClassificationFailure::Deadline),
            ),
            Phase::UserConfirmation => (
                "confirmation-timeout",
                config.confirmation_timeout(),
                PhaseEvent::ConfirmationTimeout,
            ),
            phase => match config.auto_reset_delay(phase) {
                Some(delay) => ("auto-reset", delay, PhaseEvent::AutoReset),
                None => return,
            },
        };

        let generation = state.generation;
        let core: Weak<ServiceCore> = Arc::downgrade(&self.core);
        self.core.scheduler.arm(label, delay, generation, move || {
            if let Some(core) = core.upgrade() {
                let service = AppService { core };
                if let Err(rejected) = service.submit(Event::new(what).stamped(generation)) {
                    debug!("AppService: {} timer not applied: {}", label, rejected.reason);
                }
            }
        });
    }

    fn reply(result: TransitionResult) -> CommandReply {
        match result {
            Ok(applied) => CommandReply::Accepted {
                state: applied.snapshot,
            },
            Err(rejected) => CommandReply::Rejected {
                reason: (&rejected.reason).into(),
                state: rejected.snapshot,
            },
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.core.config
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.core.scheduler
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.core.notifier
    }

    pub fn analytics(&self) -> &DisposalLog {
        &self.core.analytics
    }
}
