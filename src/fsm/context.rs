//! The system state threaded through every phase handler.
//!
//! `SystemState` is the blackboard the phase table reads and writes.  It
//! is owned by the [`StateStore`](crate::store::StateStore); everything
//! else sees `Copy` snapshots of it.

use serde::{Deserialize, Serialize};

use super::Phase;
use crate::error::{ClassificationFailure, CoreError};
use crate::events::EventKind;
use crate::sensors::{BinColor, SensorId};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A classifier verdict: which bin, and how sure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub bin_color: BinColor,
    /// 0.0 ..= 1.0
    pub confidence: f32,
}

impl Classification {
    pub fn new(bin_color: BinColor, confidence: f32) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CoreError::InvalidPayload("confidence must be within 0..=1"));
        }
        Ok(Self {
            bin_color,
            confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Sensor flags
// ---------------------------------------------------------------------------

/// "Has this sensor fired since it was last consumed", per sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensorFlags {
    pub object: bool,
    pub blue: bool,
    pub yellow: bool,
    pub brown: bool,
}

impl SensorFlags {
    pub fn get(&self, id: SensorId) -> bool {
        match id {
            SensorId::Object => self.object,
            SensorId::Blue => self.blue,
            SensorId::Yellow => self.yellow,
            SensorId::Brown => self.brown,
        }
    }

    pub fn set(&mut self, id: SensorId, fired: bool) {
        let slot = match id {
            SensorId::Object => &mut self.object,
            SensorId::Blue => &mut self.blue,
            SensorId::Yellow => &mut self.yellow,
            SensorId::Brown => &mut self.brown,
        };
        *slot = fired;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any(&self) -> bool {
        self.object || self.blue || self.yellow || self.brown
    }
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemState {
    pub phase: Phase,
    pub sensor_flags: SensorFlags,
    pub pending_classification: Option<Classification>,
    pub reward_granted: bool,
    /// Bin the user threw into during this cycle.
    pub thrown: Option<BinColor>,
    /// Bumped by every accepted transition.
    pub generation: u64,
    /// Monotonic microseconds since the store was created.
    pub last_updated_us: u64,

    // -- Observability --
    /// Event that produced the current generation.
    pub last_event: Option<EventKind>,
    pub last_failure: Option<ClassificationFailure>,
    /// Back-to-back failed classifications; reset by a successful one.
    pub consecutive_failures: u32,
}

/// Immutable copy handed out by the store.
pub type SystemSnapshot = SystemState;

impl SystemState {
    /// Process-start state: idle, generation 0, nothing pending.
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            sensor_flags: SensorFlags::default(),
            pending_classification: None,
            reward_granted: false,
            thrown: None,
            generation: 0,
            last_updated_us: 0,
            last_event: None,
            last_failure: None,
            consecutive_failures: 0,
        }
    }

    /// Does `color` match the pending classification?
    pub fn pending_matches(&self, color: BinColor) -> bool {
        self.pending_classification
            .is_some_and(|c| c.bin_color == color)
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}
