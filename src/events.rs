//! Events submitted to the state store.
//!
//! Events are produced by:
//! - the hardware loop (debounced sensor edges, classifier results)
//! - scheduler timers (confirmation timeout, auto-reset, processing deadline)
//! - front-ends (manual triggers, external classification, reset)
//!
//! ```text
//! ┌──────────────┐
//! │ HardwareLoop │────▶┐
//! │ Timer fire   │────▶│  Event { what, generation?, source? }  ──▶ StateStore
//! │ Front-end    │────▶┘
//! └──────────────┘
//! ```
//!
//! Every event is one [`PhaseEvent`] plus two optional stamps: the
//! generation it was produced against (stale stamps are rejected) and the
//! sensor whose edge it consumes.

use core::fmt;

use serde::Serialize;

use crate::error::ClassificationFailure;
use crate::fsm::context::Classification;
use crate::sensors::{BinColor, SensorId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    ObjectDetected,
    ClassificationReady(Classification),
    ClassificationFailed(ClassificationFailure),
    CorrectBin(BinColor),
    WrongBin(BinColor),
    ConfirmationTimeout,
    AutoReset,
    ManualReset,
}

impl PhaseEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ObjectDetected => EventKind::ObjectDetected,
            Self::ClassificationReady(_) => EventKind::ClassificationReady,
            Self::ClassificationFailed(_) => EventKind::ClassificationFailed,
            Self::CorrectBin(_) => EventKind::CorrectBin,
            Self::WrongBin(_) => EventKind::WrongBin,
            Self::ConfirmationTimeout => EventKind::ConfirmationTimeout,
            Self::AutoReset => EventKind::AutoReset,
            Self::ManualReset => EventKind::ManualReset,
        }
    }
}

/// Payload-free discriminant of [`PhaseEvent`], used in errors and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    ObjectDetected = 0,
    ClassificationReady = 1,
    ClassificationFailed = 2,
    CorrectBin = 3,
    WrongBin = 4,
    ConfirmationTimeout = 5,
    AutoReset = 6,
    ManualReset = 7,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ObjectDetected => "object_detected",
            Self::ClassificationReady => "classification_ready",
            Self::ClassificationFailed => "classification_failed",
            Self::CorrectBin => "correct_bin",
            Self::WrongBin => "wrong_bin",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::AutoReset => "auto_reset",
            Self::ManualReset => "manual_reset",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope handed to [`StateStore::transition`](crate::store::StateStore::transition).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub what: PhaseEvent,
    /// Generation this event was produced against.  `None` = unconditional.
    pub generation: Option<u64>,
    /// Sensor edge consumed by this event, if any.
    pub source: Option<SensorId>,
}

impl Event {
    pub fn new(what: PhaseEvent) -> Self {
        Self {
            what,
            generation: None,
            source: None,
        }
    }

    /// Only apply if the store is still at `generation`.
    pub fn stamped(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn from_sensor(mut self, id: SensorId) -> Self {
        self.source = Some(id);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.what.kind()
    }
}

impl From<PhaseEvent> for Event {
    fn from(what: PhaseEvent) -> Self {
        Self::new(what)
    }
}
