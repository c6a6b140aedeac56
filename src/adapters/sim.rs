//! Simulation adapters for running the station on a host.
//!
//! | Adapter            | Implements       | Behaviour                                   |
//! |--------------------|------------------|---------------------------------------------|
//! | `ManualSensors`    | SensorPort       | pulses injected from another thread         |
//! | `SimCamera`        | CameraPort       | blank frames, can be switched off           |
//! | `SimClassifier`    | ClassifierPort   | scripted or rotating answers after a delay  |
//! | `ConsoleIndicator` | IndicatorPort    | logs the colour when the phase changes      |
//! | `ConsoleDisplay`   | DisplayPort      | logs the image that would be drawn          |

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};

use crate::app::ports::{
    CameraError, CameraPort, ClassifierError, ClassifierPort, ClassifyFuture, DisplayPort, Frame,
    IndicatorPort,
};
use crate::drivers::led_patterns::Rgb;
use crate::error::SensorError;
use crate::fsm::Phase;
use crate::fsm::context::Classification;
use crate::sensors::{BinColor, SensorId};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Sensors
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Lines {
    held: [bool; SensorId::COUNT],
    pulsed: [bool; SensorId::COUNT],
}

/// Sensor lines driven by hand.  Clones share the same lines.
#[derive(Clone, Default)]
pub struct ManualSensors {
    lines: Arc<Mutex<Lines>>,
}

impl ManualSensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read high exactly once, as if an object passed the sensor.
    pub fn pulse(&self, id: SensorId) {
        lock(&self.lines).pulsed[id as usize] = true;
    }

    /// Hold a line at `level` until changed.
    pub fn hold(&self, id: SensorId, level: bool) {
        lock(&self.lines).held[id as usize] = level;
    }
}

impl crate::app::ports::SensorPort for ManualSensors {
    fn sensor_read(&mut self, id: SensorId) -> Result<bool, SensorError> {
        let mut lines = lock(&self.lines);
        let pulsed = core::mem::take(&mut lines.pulsed[id as usize]);
        Ok(pulsed || lines.held[id as usize])
    }
}

// ───────────────────────────────────────────────────────────────
// Camera
// ───────────────────────────────────────────────────────────────

pub struct SimCamera {
    available: bool,
    captured: u32,
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCamera {
    pub fn new() -> Self {
        Self {
            available: true,
            captured: 0,
        }
    }

    pub fn unplugged() -> Self {
        Self {
            available: false,
            captured: 0,
        }
    }
}

impl CameraPort for SimCamera {
    fn capture(&mut self) -> Result<Frame, CameraError> {
        if !self.available {
            return Err(CameraError::Unavailable);
        }
        self.captured += 1;
        debug!("SimCamera: frame #{}", self.captured);
        Ok(Frame {
            width: 640,
            height: 480,
            data: vec![0; 640 * 480 * 3],
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Classifier
// ───────────────────────────────────────────────────────────────

type Answer = Result<Classification, ClassifierError>;

/// Answers after `latency`.  Scripted answers are used first, then it
/// rotates blue → yellow → brown at 0.9 confidence.
#[derive(Clone)]
pub struct SimClassifier {
    latency: Duration,
    script: Arc<Mutex<VecDeque<Answer>>>,
    rotation: usize,
}

impl SimClassifier {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            script: Arc::new(Mutex::new(VecDeque::new())),
            rotation: 0,
        }
    }

    /// Queue the next answer.  Clones share the queue.
    pub fn script(&self, answer: Answer) {
        lock(&self.script).push_back(answer);
    }

    fn next_answer(&mut self) -> Answer {
        if let Some(answer) = lock(&self.script).pop_front() {
            return answer;
        }
        let bin = BinColor::ALL[self.rotation % BinColor::ALL.len()];
        self.rotation += 1;
        Classification::new(bin, 0.9).map_err(|_| ClassifierError::Failed)
    }
}

impl ClassifierPort for SimClassifier {
    fn classify<'a>(&'a mut self, frame: &'a Frame) -> ClassifyFuture<'a> {
        let answer = self.next_answer();
        let latency = self.latency;
        Box::pin(async move {
            debug!("SimClassifier: {}x{} frame", frame.width, frame.height);
            async_io_mini::Timer::after(latency).await;
            answer
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Console outputs
// ───────────────────────────────────────────────────────────────

/// Logs the indicator colour whenever the phase changes.
#[derive(Default)]
pub struct ConsoleIndicator {
    last_phase: Option<Phase>,
}

impl IndicatorPort for ConsoleIndicator {
    fn set_indicator(&mut self, phase: Phase, (r, g, b): Rgb) {
        if self.last_phase != Some(phase) {
            info!("LED | {} | #{:02x}{:02x}{:02x}", phase, r, g, b);
            self.last_phase = Some(phase);
        }
    }
}

#[derive(Default)]
pub struct ConsoleDisplay;

impl DisplayPort for ConsoleDisplay {
    fn render(&mut self, phase: Phase, image: &'static str) {
        info!("SCREEN | {} | {}", phase, image);
    }
}
