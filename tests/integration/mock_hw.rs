//! Mock hardware adapters for integration tests.
//!
//! Every mock records what the core asked of it so tests can assert on
//! the full history without real GPIO, camera or classifier.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use itrash::app::ports::{
    CameraError, CameraPort, ClassifierError, ClassifierPort, ClassifyFuture, DisplayPort, Frame,
    IndicatorPort, MessagePublisher, PublishError, SensorPort,
};
use itrash::drivers::led_patterns::Rgb;
use itrash::error::SensorError;
use itrash::fsm::Phase;
use itrash::fsm::context::Classification;
use itrash::sensors::{SensorId, SensorLevels};

// ── Sensors ───────────────────────────────────────────────────

/// Replays scripted samples; once the script runs out every sensor reads
/// low.  `None` in the script is a failed read.
#[derive(Clone, Default)]
pub struct ScriptedSensors {
    samples: Arc<Mutex<VecDeque<Option<SensorLevels>>>>,
}

#[allow(dead_code)]
impl ScriptedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, levels: SensorLevels) {
        self.samples.lock().unwrap().push_back(Some(levels));
    }

    pub fn push_high(&self, id: SensorId) {
        self.push(SensorLevels::default().with(id, true));
    }

    pub fn push_low(&self) {
        self.push(SensorLevels::default());
    }

    pub fn push_failure(&self) {
        self.samples.lock().unwrap().push_back(None);
    }
}

impl SensorPort for ScriptedSensors {
    fn sensor_read(&mut self, id: SensorId) -> Result<bool, SensorError> {
        Ok(self.read_levels()?.get(id))
    }

    fn read_levels(&mut self) -> Result<SensorLevels, SensorError> {
        match self.samples.lock().unwrap().pop_front() {
            Some(Some(levels)) => Ok(levels),
            Some(None) => Err(SensorError::GpioReadFailed),
            None => Ok(SensorLevels::default()),
        }
    }
}

// ── Camera ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCamera {
    pub fail: Option<CameraError>,
    pub captures: Arc<Mutex<u32>>,
}

impl CameraPort for MockCamera {
    fn capture(&mut self) -> Result<Frame, CameraError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        *self.captures.lock().unwrap() += 1;
        Ok(Frame {
            width: 4,
            height: 4,
            data: vec![0; 48],
        })
    }
}

// ── Classifier ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub enum Verdict {
    Answer(Classification),
    Fail(ClassifierError),
    /// Never answers within the test's timeout.
    Hang,
}

pub struct MockClassifier {
    pub verdict: Verdict,
    pub calls: Arc<Mutex<u32>>,
}

#[allow(dead_code)]
impl MockClassifier {
    pub fn answering(c: Classification) -> Self {
        Self {
            verdict: Verdict::Answer(c),
            calls: Arc::default(),
        }
    }

    pub fn with(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: Arc::default(),
        }
    }
}

impl ClassifierPort for MockClassifier {
    fn classify<'a>(&'a mut self, _frame: &'a Frame) -> ClassifyFuture<'a> {
        *self.calls.lock().unwrap() += 1;
        let verdict = self.verdict;
        Box::pin(async move {
            match verdict {
                Verdict::Answer(c) => Ok(c),
                Verdict::Fail(e) => Err(e),
                Verdict::Hang => {
                    async_io_mini::Timer::after(Duration::from_secs(60)).await;
                    Err(ClassifierError::Failed)
                }
            }
        })
    }
}

// ── Indicator / display / broker ──────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingIndicator {
    pub calls: Arc<Mutex<Vec<(Phase, Rgb)>>>,
}

#[allow(dead_code)]
impl RecordingIndicator {
    pub fn last(&self) -> Option<(Phase, Rgb)> {
        self.calls.lock().unwrap().last().copied()
    }
}

impl IndicatorPort for RecordingIndicator {
    fn set_indicator(&mut self, phase: Phase, rgb: Rgb) {
        self.calls.lock().unwrap().push((phase, rgb));
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub images: Arc<Mutex<Vec<&'static str>>>,
}

impl DisplayPort for RecordingDisplay {
    fn render(&mut self, _phase: Phase, image: &'static str) {
        self.images.lock().unwrap().push(image);
    }
}

#[derive(Clone, Default)]
pub struct RecordingBroker {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MessagePublisher for RecordingBroker {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
