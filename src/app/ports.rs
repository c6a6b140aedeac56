//! Port traits: the hexagonal boundary between the core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / HardwareLoop (core)
//! ```
//!
//! Driven adapters (sensors, camera, classifier, LEDs, display, message
//! broker, config file) implement these traits.  The core consumes them
//! via generics or boxed trait objects and never touches hardware or
//! transports directly.

use core::fmt;
use core::future::Future;
use core::pin::Pin;

use crate::config::SystemConfig;
use crate::drivers::led_patterns::Rgb;
use crate::error::{ClassificationFailure, SensorError};
use crate::fsm::Phase;
use crate::fsm::context::{Classification, SystemSnapshot};
use crate::sensors::{SensorId, SensorLevels};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: GPIO → core)
// ───────────────────────────────────────────────────────────────

/// Raw proximity sensor reads.  `true` means "object present" after any
/// active-low inversion the adapter applies.
pub trait SensorPort {
    fn sensor_read(&mut self, id: SensorId) -> Result<bool, SensorError>;

    /// Sample every sensor once.
    fn read_levels(&mut self) -> Result<SensorLevels, SensorError> {
        let mut levels = SensorLevels::default();
        for id in SensorId::ALL {
            levels.set(id, self.sensor_read(id)?);
        }
        Ok(levels)
    }
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: core → LED strip)
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    /// Show `phase`; `rgb` is the pattern engine's output for this cycle.
    fn set_indicator(&mut self, phase: Phase, rgb: Rgb);
}

// ───────────────────────────────────────────────────────────────
// Camera + classifier ports
// ───────────────────────────────────────────────────────────────

/// One captured image.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub trait CameraPort {
    fn capture(&mut self) -> Result<Frame, CameraError>;
}

/// Future returned by [`ClassifierPort::classify`].  Polled on the
/// hardware-loop thread only, so it need not be `Send`.
pub type ClassifyFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Classification, ClassifierError>> + 'a>>;

/// Asynchronous image classifier.  May take seconds; the caller bounds
/// the wait.
pub trait ClassifierPort {
    fn classify<'a>(&'a mut self, frame: &'a Frame) -> ClassifyFuture<'a>;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    /// Show the screen for `phase`; `image` names the asset to draw.
    fn render(&mut self, phase: Phase, image: &'static str);
}

// ───────────────────────────────────────────────────────────────
// Transition sink (driven adapter: core → display / broker / logs)
// ───────────────────────────────────────────────────────────────

/// Receives `(old, new)` once per accepted transition, on the notifier's
/// worker thread for this subscriber.
pub trait TransitionSink: Send {
    fn on_transition(&mut self, old: &SystemSnapshot, new: &SystemSnapshot);
}

impl<F> TransitionSink for F
where
    F: FnMut(&SystemSnapshot, &SystemSnapshot) + Send,
{
    fn on_transition(&mut self, old: &SystemSnapshot, new: &SystemSnapshot) {
        self(old, new);
    }
}

// ───────────────────────────────────────────────────────────────
// Message publisher (driven adapter: core → pub/sub broker)
// ───────────────────────────────────────────────────────────────

pub trait MessagePublisher: Send {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the startup configuration.
///
/// Implementations MUST run [`SystemConfig::validate`] and reject
/// invalid values with [`ConfigError::ValidationFailed`] rather than
/// clamping them.
pub trait ConfigPort {
    /// Returns [`ConfigError::NotFound`] when nothing is stored, so the
    /// caller can decide to fall back to defaults.
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Time + generation sources
// ───────────────────────────────────────────────────────────────

pub trait TimePort: Send + Sync {
    /// Monotonic microseconds.
    fn uptime_us(&self) -> u64;
}

/// Where the scheduler checks whether an armed timer is still current.
///
/// Decouples the [`PhaseScheduler`](crate::scheduler::PhaseScheduler)
/// from the store: at fire time it only needs the live generation.
pub trait GenerationSource: Send + Sync {
    fn current_generation(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// Device missing or refused to open.
    Unavailable,
    /// Device open but returned no frame.
    NoFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierError {
    /// Backend error (network, model, malformed answer).
    Failed,
    /// Answer named a material that maps to no bin.
    UnknownMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Broker connection is down.
    Disconnected,
    /// Outbound buffer is full.
    Backpressure,
}

#[derive(Debug)]
pub enum ConfigError {
    /// No config found (first run).
    NotFound,
    /// Stored config could not be parsed.
    Corrupted,
    /// A config field failed validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the backing store.
    IoError,
}

impl From<CameraError> for ClassificationFailure {
    fn from(e: CameraError) -> Self {
        match e {
            CameraError::Unavailable => Self::CameraUnavailable,
            CameraError::NoFrame => Self::CaptureFailed,
        }
    }
}

impl From<ClassifierError> for ClassificationFailure {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Failed => Self::ClassifierFailed,
            ClassifierError::UnknownMaterial => Self::UnknownMaterial,
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "camera unavailable"),
            Self::NoFrame => write!(f, "no frame"),
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "classifier failed"),
            Self::UnknownMaterial => write!(f, "unknown material"),
        }
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "broker disconnected"),
            Self::Backpressure => write!(f, "outbound buffer full"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
