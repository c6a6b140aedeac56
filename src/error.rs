//! Unified error types for the iTrash core.
//!
//! Every subsystem error converts into [`Error`], so callers at the edge
//! (front-end routers, the binary) handle one type.  All variants are
//! `Copy` so rejections can be returned alongside snapshots without
//! allocation.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::events::EventKind;
use crate::fsm::Phase;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A phase transition was refused.
    Core(CoreError),
    /// A raw sensor read failed.
    Sensor(SensorError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A worker thread could not be started.
    Spawn(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(e) => write!(f, "core: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(name) => write!(f, "failed to spawn worker '{name}'"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Core (state store) errors
// ---------------------------------------------------------------------------

/// Why the state store refused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// `(phase, event)` is not a row of the transition table.
    InvalidTransition { phase: Phase, event: EventKind },
    /// The event was stamped with a generation the store has moved past.
    StaleEvent { event_generation: u64, current: u64 },
    /// Camera or classifier failure surfaced to a caller.
    ClassificationFailure(ClassificationFailure),
    /// Event payload failed validation (e.g. confidence outside 0..=1).
    InvalidPayload(&'static str),
}

impl CoreError {
    /// Stale rejections are expected and silently discarded.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleEvent { .. })
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { phase, event } => {
                write!(f, "invalid transition: {event} in phase {phase}")
            }
            Self::StaleEvent {
                event_generation,
                current,
            } => write!(
                f,
                "stale event: generation {event_generation}, store at {current}"
            ),
            Self::ClassificationFailure(e) => write!(f, "classification failed: {e}"),
            Self::InvalidPayload(msg) => write!(f, "invalid payload: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<CoreError> for Error {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

// ---------------------------------------------------------------------------
// Classification failures
// ---------------------------------------------------------------------------

/// Reasons a classification attempt ends in the `error` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationFailure {
    /// No camera attached or it refused to open.
    CameraUnavailable,
    /// The camera returned no frame.
    CaptureFailed,
    /// The classifier returned an error.
    ClassifierFailed,
    /// The classifier answered with a class that maps to no bin.
    UnknownMaterial,
    /// The classifier did not answer within the bounded wait.
    Timeout,
    /// The processing deadline elapsed with no result at all.
    Deadline,
}

impl fmt::Display for ClassificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CameraUnavailable => write!(f, "camera unavailable"),
            Self::CaptureFailed => write!(f, "capture failed"),
            Self::ClassifierFailed => write!(f, "classifier error"),
            Self::UnknownMaterial => write!(f, "unknown material"),
            Self::Timeout => write!(f, "classifier timed out"),
            Self::Deadline => write!(f, "processing deadline elapsed"),
        }
    }
}

impl From<ClassificationFailure> for CoreError {
    fn from(e: ClassificationFailure) -> Self {
        Self::ClassificationFailure(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
    /// No pin is bound to the requested sensor.
    Unbound,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::Unbound => write!(f, "sensor not bound to a pin"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(match e {
            ConfigError::ValidationFailed(msg) => msg,
            ConfigError::NotFound => "not found",
            ConfigError::Corrupted => "corrupted",
            ConfigError::IoError => "I/O error",
        })
    }
}
