//! The single source of truth for the station's phase.
//!
//! ```text
//!  HardwareLoop ──┐
//!  Timer fire  ───┼──▶ transition(event) ──▶ ┌──────────── Mutex ────────────┐
//!  Front-ends  ───┘                          │ check stamp · table · mutate  │
//!                                            │ stamp time · publish (no I/O) │
//!                                            └───────────────────────────────┘
//! ```
//!
//! One `std::sync::Mutex` guards the [`SystemState`].  It is held only for
//! check-and-mutate plus a non-blocking publish; no camera, classifier or
//! subscriber code ever runs under it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{GenerationSource, TimePort};
use crate::error::CoreError;
use crate::events::Event;
use crate::fsm::context::{SystemSnapshot, SystemState};
use crate::fsm::{Phase, PhaseMachine};
use crate::notifier::Notifier;
use crate::sensors::SensorId;

/// Result of an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Applied {
    pub from: Phase,
    pub snapshot: SystemSnapshot,
}

/// Result of a refused transition: why, and what the state is now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rejected {
    pub reason: CoreError,
    pub snapshot: SystemSnapshot,
}

pub type TransitionResult = Result<Applied, Rejected>;

struct Inner {
    state: SystemState,
    machine: PhaseMachine,
}

pub struct StateStore {
    inner: Mutex<Inner>,
    notifier: Arc<Notifier>,
    clock: Box<dyn TimePort>,
}

impl StateStore {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self::with_clock(notifier, Box::new(MonotonicClock::new()))
    }

    pub fn with_clock(notifier: Arc<Notifier>, clock: Box<dyn TimePort>) -> Self {
        let mut state = SystemState::new();
        state.last_updated_us = clock.uptime_us();
        Self {
            inner: Mutex::new(Inner {
                state,
                machine: PhaseMachine::new(),
            }),
            notifier,
            clock,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SystemSnapshot {
        self.lock().state
    }

    /// Atomically validate and apply `event`.
    ///
    /// On acceptance the generation is bumped, `last_updated_us` advances
    /// and subscribers are notified exactly once.  On rejection nothing
    /// changes.
    pub fn transition(&self, event: Event) -> TransitionResult {
        let mut inner = self.lock();
        let old = inner.state;

        let Inner { state, machine } = &mut *inner;
        match machine.apply(state, &event) {
            Ok(from) => {
                let now = self.clock.uptime_us();
                state.last_updated_us = now.max(old.last_updated_us + 1);
                let new = *state;
                let delivery = self.notifier.publish(&old, &new);
                drop(inner);
                delivery.log();

                info!(
                    "Store: {} -> {} on {} (gen {})",
                    from,
                    new.phase,
                    event.kind(),
                    new.generation
                );
                Ok(Applied {
                    from,
                    snapshot: new,
                })
            }
            Err(reason) => {
                drop(inner);
                if reason.is_stale() {
                    debug!("Store: discarded {}: {}", event.kind(), reason);
                } else {
                    warn!("Store: rejected: {}", reason);
                }
                Err(Rejected {
                    reason,
                    snapshot: old,
                })
            }
        }
    }

    /// Record that `id` fired, ahead of submitting its event.  Not a
    /// transition: no generation bump, no notification.
    pub fn latch_sensor(&self, id: SensorId) {
        self.lock().state.sensor_flags.set(id, true);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GenerationSource for StateStore {
    fn current_generation(&self) -> u64 {
        self.lock().state.generation
    }
}
