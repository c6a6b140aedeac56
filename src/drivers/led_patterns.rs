//! Indicator pattern engine for the bin-side LED strip.
//!
//! The hardware loop calls [`LedPatternEngine::tick`] once per poll period
//! and hands the resulting colour to the
//! [`IndicatorPort`](crate::app::ports::IndicatorPort).
//!
//! ## Layers (highest first)
//!
//! 1. **Fault**: rapid red flash while sensor reads are failing
//! 2. **Phase**: one pattern per phase, see [`indicator_for`]
//!
//! ## Pattern types
//!
//! | Pattern      | Description                      | Rate   |
//! |-------------|----------------------------------|--------|
//! | Solid        | Constant colour                  | n/a    |
//! | SlowPulse    | Triangular brightness fade       | 1 Hz   |
//! | FastBlink    | On/off square wave               | 4 Hz   |
//! | Breathing    | Slow ramp up/down                | 0.5 Hz |
//! | DoubleBlink  | Two quick flashes, then pause    | 1 Hz   |
//! | RapidFlash   | Very fast on/off                 | 8 Hz   |

use crate::fsm::Phase;
use crate::sensors::BinColor;

/// Colour as (R, G, B), each 0–255.
pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    SlowPulse,
    FastBlink,
    Breathing,
    DoubleBlink,
    RapidFlash,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layer {
    colour: Rgb,
    pattern: PatternId,
}

pub struct LedPatternEngine {
    elapsed_ms: u32,
    shown: Option<Layer>,
    phase_layer: Option<Layer>,
    fault_layer: Option<Layer>,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            elapsed_ms: 0,
            shown: None,
            phase_layer: None,
            fault_layer: None,
        }
    }

    /// Select the pattern for `phase`.  `pending` picks the colour shown
    /// while waiting for the user to throw.
    pub fn show_phase(&mut self, phase: Phase, pending: Option<BinColor>) {
        let (colour, pattern) = indicator_for(phase, pending);
        self.phase_layer = Some(Layer { colour, pattern });
    }

    /// Raise or clear the fault overlay.
    pub fn set_fault(&mut self, active: bool) {
        self.fault_layer = active.then_some(Layer {
            colour: COLOUR_RED,
            pattern: PatternId::RapidFlash,
        });
    }

    /// Advance by `delta_ms` and return the colour to show now.
    ///
    /// The animation restarts from its first frame whenever the selected
    /// layer changes.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.elapsed_ms = self.elapsed_ms.wrapping_add(delta_ms);

        let selected = self.fault_layer.or(self.phase_layer);
        if selected.is_some() && selected != self.shown {
            self.elapsed_ms = 0;
        }
        self.shown = selected;

        match self.shown {
            Some(layer) => self.render(layer),
            None => COLOUR_OFF,
        }
    }

    fn render(&self, layer: Layer) -> Rgb {
        let t = self.elapsed_ms;
        let lit = |on: bool| if on { layer.colour } else { COLOUR_OFF };
        match layer.pattern {
            PatternId::Solid => layer.colour,
            PatternId::Off => COLOUR_OFF,
            PatternId::SlowPulse => dim(layer.colour, ramp(t, 1000)),
            PatternId::Breathing => dim(layer.colour, ramp(t, 2000)),
            PatternId::FastBlink => lit(t % 250 < 125),
            PatternId::RapidFlash => lit(t % 125 < 63),
            PatternId::DoubleBlink => {
                let cycle = t % 1000;
                lit(cycle < 100 || (200..300).contains(&cycle))
            }
        }
    }
}

/// Triangular brightness 0→255→0 over `period_ms`.
fn ramp(elapsed_ms: u32, period_ms: u32) -> u8 {
    let pos = u64::from(elapsed_ms % period_ms);
    let half = u64::from(period_ms) / 2;
    let level = if pos < half {
        pos * 255 / half
    } else {
        (u64::from(period_ms) - pos) * 255 / half
    };
    level.min(255) as u8
}

fn dim((r, g, b): Rgb, brightness: u8) -> Rgb {
    let k = u16::from(brightness);
    let ch = |c: u8| ((u16::from(c) * k) / 255) as u8;
    (ch(r), ch(g), ch(b))
}

/// Colour and pattern shown for each phase.
pub fn indicator_for(phase: Phase, pending: Option<BinColor>) -> (Rgb, PatternId) {
    match phase {
        Phase::Idle => (COLOUR_OFF, PatternId::Off),
        Phase::Processing => (COLOUR_WHITE, PatternId::SlowPulse),
        Phase::UserConfirmation => match pending {
            Some(bin) => (bin_colour(bin), PatternId::Solid),
            None => (COLOUR_WHITE, PatternId::Solid),
        },
        Phase::Reward => (COLOUR_GREEN, PatternId::DoubleBlink),
        Phase::Incorrect => (COLOUR_RED, PatternId::FastBlink),
        Phase::Timeout => (COLOUR_AMBER, PatternId::Breathing),
        Phase::Error => (COLOUR_RED, PatternId::RapidFlash),
        Phase::ShowResult => (COLOUR_WHITE, PatternId::Solid),
    }
}

pub fn bin_colour(bin: BinColor) -> Rgb {
    match bin {
        BinColor::Blue => COLOUR_BLUE,
        BinColor::Yellow => COLOUR_YELLOW,
        BinColor::Brown => COLOUR_BROWN,
    }
}

// ── Palette ───────────────────────────────────────────────────

pub const COLOUR_OFF: Rgb = (0, 0, 0);
pub const COLOUR_WHITE: Rgb = (255, 255, 255);
pub const COLOUR_BLUE: Rgb = (0, 0, 255);
pub const COLOUR_YELLOW: Rgb = (255, 255, 0);
pub const COLOUR_BROWN: Rgb = (139, 69, 19);
pub const COLOUR_GREEN: Rgb = (0, 255, 0);
pub const COLOUR_RED: Rgb = (255, 0, 0);
pub const COLOUR_AMBER: Rgb = (255, 191, 0);
