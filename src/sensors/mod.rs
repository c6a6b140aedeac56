//! Sensor identities and raw level sampling.
//!
//! Four proximity sensors feed the station: one at the intake that sees an
//! object being offered, and one inside each bin.  The hardware loop reads
//! a [`SensorLevels`] sample every period and hands it to the
//! [`SensorDebouncer`](debounce::SensorDebouncer), which turns levels into
//! one-shot edges.

pub mod debounce;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bin colours
// ---------------------------------------------------------------------------

/// The three bins a user can throw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinColor {
    Blue,
    Yellow,
    Brown,
}

impl BinColor {
    pub const ALL: [BinColor; 3] = [Self::Blue, Self::Yellow, Self::Brown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Brown => "brown",
        }
    }

    /// Bin for a material class reported by a classifier.
    ///
    /// Paper-like and glass go to blue, metal and plastic to yellow,
    /// organic waste to brown.  Unknown classes map to no bin.
    pub fn for_material(material: &str) -> Option<Self> {
        match material.trim().to_ascii_uppercase().as_str() {
            "BIODEGRADABLE" => Some(Self::Brown),
            "CARDBOARD" | "CLOTH" | "GLASS" | "PAPER" => Some(Self::Blue),
            "METAL" | "PLASTIC" => Some(Self::Yellow),
            _ => None,
        }
    }

    /// The bin sensor that watches this bin.
    pub fn sensor(self) -> SensorId {
        match self {
            Self::Blue => SensorId::Blue,
            Self::Yellow => SensorId::Yellow,
            Self::Brown => SensorId::Brown,
        }
    }
}

impl fmt::Display for BinColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinColor {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "yellow" => Ok(Self::Yellow),
            "brown" => Ok(Self::Brown),
            _ => Err(UnknownName),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor identities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SensorId {
    /// Intake sensor: an object is being offered.
    Object = 0,
    Blue = 1,
    Yellow = 2,
    Brown = 3,
}

impl SensorId {
    pub const COUNT: usize = 4;
    pub const ALL: [SensorId; Self::COUNT] = [Self::Object, Self::Blue, Self::Yellow, Self::Brown];

    /// The bin this sensor watches, or `None` for the intake sensor.
    pub fn bin_color(self) -> Option<BinColor> {
        match self {
            Self::Object => None,
            Self::Blue => Some(BinColor::Blue),
            Self::Yellow => Some(BinColor::Yellow),
            Self::Brown => Some(BinColor::Brown),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Brown => "brown",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorId {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object" | "object-detected" | "object_detected" => Ok(Self::Object),
            other => other.parse::<BinColor>().map(BinColor::sensor),
        }
    }
}

/// A sensor or bin name that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownName;

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sensor or bin name")
    }
}

// ---------------------------------------------------------------------------
// Raw levels
// ---------------------------------------------------------------------------

/// One sample of every sensor's logical level (`true` = object present).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorLevels([bool; SensorId::COUNT]);

impl SensorLevels {
    pub fn get(&self, id: SensorId) -> bool {
        self.0[id as usize]
    }

    pub fn set(&mut self, id: SensorId, level: bool) {
        self.0[id as usize] = level;
    }

    /// Builder-style helper, mostly for tests and simulators.
    pub fn with(mut self, id: SensorId, level: bool) -> Self {
        self.set(id, level);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, bool)> + '_ {
        SensorId::ALL.iter().map(|&id| (id, self.get(id)))
    }
}
