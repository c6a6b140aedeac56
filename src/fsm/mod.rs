//! Phase state machine: transition table plus function-pointer actions.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                   │
//! │  ┌───────────────────┬──────────────────────┬──────────────┐  │
//! │  │ Phase             │ on_enter             │ on_exit      │  │
//! │  ├───────────────────┼──────────────────────┼──────────────┤  │
//! │  │ Idle              │ fn(state, event)     │ none         │  │
//! │  │ Processing        │ fn(state, event)     │ none         │  │
//! │  │ UserConfirmation  │ fn(state, event)     │ fn(state)    │  │
//! │  │ Reward            │ fn(state, event)     │ fn(state)    │  │
//! │  │ ...               │                      │              │  │
//! │  └───────────────────┴──────────────────────┴──────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`next_phase`] decides *whether* an event moves the machine and where
//! to; the table decides *what happens to the state* on the way.  Pairs
//! not listed in [`next_phase`] are rejected, never ignored.

pub mod context;
pub mod states;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::events::{Event, PhaseEvent};
use context::SystemState;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Processing = 1,
    ShowResult = 2,
    UserConfirmation = 3,
    Reward = 4,
    Incorrect = 5,
    Timeout = 6,
    Error = 7,
}

impl Phase {
    /// Total number of phases, sizes the table array.
    pub const COUNT: usize = 8;

    pub const ALL: [Phase; Self::COUNT] = [
        Self::Idle,
        Self::Processing,
        Self::ShowResult,
        Self::UserConfirmation,
        Self::Reward,
        Self::Incorrect,
        Self::Timeout,
        Self::Error,
    ];

    /// Convert a table index back to `Phase`.  Out-of-range returns `Error`.
    pub fn from_index(idx: usize) -> Self {
        Self::ALL.get(idx).copied().unwrap_or_else(|| {
            debug_assert!(false, "invalid phase index: {idx}");
            Self::Error
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::ShowResult => "show_result",
            Self::UserConfirmation => "user_confirmation",
            Self::Reward => "reward",
            Self::Incorrect => "incorrect",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Where `event` takes the machine from `phase`, or `None` if the pair is
/// not a valid transition.  Bin events are guarded on the pending
/// classification.
pub fn next_phase(phase: Phase, event: &PhaseEvent, state: &SystemState) -> Option<Phase> {
    use Phase::*;
    use PhaseEvent::*;

    match (phase, event) {
        (_, ManualReset) => Some(Idle),

        (Idle, ObjectDetected) => Some(Processing),

        (Processing, ClassificationReady(_)) => Some(UserConfirmation),
        (Processing, ClassificationFailed(_)) => Some(Error),

        (UserConfirmation, CorrectBin(color)) if state.pending_matches(*color) => Some(Reward),
        (UserConfirmation, WrongBin(color))
            if state.pending_classification.is_some() && !state.pending_matches(*color) =>
        {
            Some(Incorrect)
        }
        (UserConfirmation, ConfirmationTimeout) => Some(Timeout),

        (Reward | Incorrect | Timeout | Error, AutoReset) => Some(Idle),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Runs once when a phase is entered, with the event that caused it.
pub type PhaseEnterFn = fn(&mut SystemState, &PhaseEvent);

/// Runs once when a phase is left.
pub type PhaseExitFn = fn(&mut SystemState);

/// One row of the phase table.
pub struct PhaseDescriptor {
    pub phase: Phase,
    pub on_enter: Option<PhaseEnterFn>,
    pub on_exit: Option<PhaseExitFn>,
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Applies events to a [`SystemState`].  Holds no state of its own beyond
/// the table, so the store can keep it next to the data under one lock.
pub struct PhaseMachine {
    table: [PhaseDescriptor; Phase::COUNT],
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            table: states::build_phase_table(),
        }
    }

    /// Validate and apply `event`.  On success returns the phase that was
    /// left; on rejection `state` is untouched.
    pub fn apply(&self, state: &mut SystemState, event: &Event) -> Result<Phase, CoreError> {
        if let Some(stamp) = event.generation {
            if stamp != state.generation {
                return Err(CoreError::StaleEvent {
                    event_generation: stamp,
                    current: state.generation,
                });
            }
        }

        let from = state.phase;
        let to = next_phase(from, &event.what, state).ok_or(CoreError::InvalidTransition {
            phase: from,
            event: event.kind(),
        })?;

        if let Some(exit) = self.table[from as usize].on_exit {
            exit(state);
        }
        state.phase = to;
        if let Some(enter) = self.table[to as usize].on_enter {
            enter(state, &event.what);
        }

        if let Some(id) = event.source {
            state.sensor_flags.set(id, false);
        }
        state.generation += 1;
        state.last_event = Some(event.kind());
        Ok(from)
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
