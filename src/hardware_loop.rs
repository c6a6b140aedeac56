//! The single polling driver.
//!
//! ```text
//!  every poll period:
//!   ┌────────────┐   levels   ┌───────────┐  fired ids  ┌──────────────────────────┐
//!   │ SensorPort │──────────▶ │ Debouncer │───────────▶ │ AppService::dispatch_    │
//!   └────────────┘            └───────────┘             │ sensor                   │
//!                                                       └──────────────────────────┘
//!   snapshot.phase == processing and not yet classified at this generation?
//!      └─▶ settle ─▶ CameraPort::capture ─▶ ClassifierPort::classify (bounded)
//!            └─▶ classification_ready / classification_failed, stamped
//!   LedPatternEngine::tick ─▶ IndicatorPort::set_indicator
//! ```
//!
//! Camera and classifier calls happen on this thread with no lock held.
//! A failed read or a failed classification never ends the loop: it is
//! logged, reported through the state store, and polling continues.
//! The settle wait and the classifier call are both raced against a
//! watcher that gives up as soon as the loop is stopped or the store
//! leaves the processing generation (a manual reset, the deadline).

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_io_mini::Timer;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::ports::{CameraPort, ClassifierError, ClassifierPort, IndicatorPort, SensorPort};
use crate::app::service::AppService;
use crate::config::ClassificationSource;
use crate::drivers::led_patterns::LedPatternEngine;
use crate::error::{ClassificationFailure, Error};
use crate::events::{Event, PhaseEvent};
use crate::fsm::Phase;
use crate::fsm::context::Classification;
use crate::sensors::debounce::SensorDebouncer;
use crate::worker::{DEFAULT_STACK_KB, spawn_worker};

/// How often a long wait re-checks whether it should give up.
const WATCH_TICK: Duration = Duration::from_millis(20);

/// Per-loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub read_errors: u64,
    pub edges: u64,
    pub classifications: u64,
    pub classification_failures: u64,
    /// Classifications given up because the loop stopped or the phase
    /// moved on.
    pub abandoned: u64,
}

/// Why a wait ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Stopped,
    Superseded,
}

enum Outcome {
    Answer(Result<Classification, ClassifierError>),
    TimedOut,
    Interrupted(Interrupt),
}

/// Resolves once `running` clears or the store leaves `generation`.
async fn interrupted(running: &AtomicBool, service: &AppService, generation: u64) -> Interrupt {
    loop {
        if !running.load(Ordering::Acquire) {
            return Interrupt::Stopped;
        }
        if service.get_status().generation != generation {
            return Interrupt::Superseded;
        }
        Timer::after(WATCH_TICK).await;
    }
}

pub struct HardwareLoop<S, C, K, I> {
    service: AppService,
    sensors: S,
    camera: C,
    classifier: K,
    indicator: I,
    debouncer: Option<SensorDebouncer>,
    leds: LedPatternEngine,
    classified_generation: Option<u64>,
    running: Arc<AtomicBool>,
    stats: LoopStats,
}

impl<S, C, K, I> HardwareLoop<S, C, K, I>
where
    S: SensorPort,
    C: CameraPort,
    K: ClassifierPort,
    I: IndicatorPort,
{
    pub fn new(service: AppService, sensors: S, camera: C, classifier: K, indicator: I) -> Self {
        Self {
            service,
            sensors,
            camera,
            classifier,
            indicator,
            debouncer: None,
            leds: LedPatternEngine::new(),
            classified_generation: None,
            running: Arc::new(AtomicBool::new(true)),
            stats: LoopStats::default(),
        }
    }

    /// One loop iteration.  Never fails; problems are logged and counted.
    pub fn cycle(&mut self) {
        self.stats.cycles += 1;

        // 1. Sensors
        match self.sensors.read_levels() {
            Ok(levels) => {
                self.leds.set_fault(false);
                match &mut self.debouncer {
                    // First good sample only primes the edge detector.
                    slot @ None => *slot = Some(SensorDebouncer::primed(levels)),
                    Some(debouncer) => {
                        for id in debouncer.poll(&levels) {
                            self.stats.edges += 1;
                            if let Err(rejected) = self.service.dispatch_sensor(id) {
                                debug!("HardwareLoop: {} edge not applied: {}", id, rejected.reason);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                self.stats.read_errors += 1;
                self.leds.set_fault(true);
                warn!("HardwareLoop: sensor read failed: {}", e);
            }
        }

        // 2. Classification pipeline
        let state = self.service.get_status();
        if state.phase == Phase::Processing
            && self.service.config().classification_source == ClassificationSource::Internal
            && self.classified_generation != Some(state.generation)
        {
            self.classified_generation = Some(state.generation);
            self.classify(state.generation);
        }

        // 3. Indicator
        let state = self.service.get_status();
        self.leds.show_phase(
            state.phase,
            state.pending_classification.map(|c| c.bin_color),
        );
        let rgb = self.leds.tick(self.service.config().poll_period_ms);
        self.indicator.set_indicator(state.phase, rgb);
    }

    /// Capture and classify for the `processing` phase at `generation`.
    fn classify(&mut self, generation: u64) {
        let config = self.service.config().clone();
        let (running, service) = (&*self.running, &self.service);

        let settled = future::block_on(future::or(
            async {
                Timer::after(config.object_settle()).await;
                None
            },
            async { Some(interrupted(running, service, generation).await) },
        ));
        if let Some(why) = settled {
            self.abandon(generation, why);
            return;
        }

        let frame = match self.camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("HardwareLoop: capture failed: {}", e);
                self.report_failure(generation, e.into());
                return;
            }
        };

        let classifier = &mut self.classifier;
        let timeout = config.classifier_timeout();
        let outcome = future::block_on(future::or(
            async { Outcome::Answer(classifier.classify(&frame).await) },
            future::or(
                async {
                    Timer::after(timeout).await;
                    Outcome::TimedOut
                },
                async { Outcome::Interrupted(interrupted(running, service, generation).await) },
            ),
        ));

        match outcome {
            Outcome::Answer(Ok(result)) => {
                self.stats.classifications += 1;
                info!(
                    "HardwareLoop: classified as {} ({:.2})",
                    result.bin_color, result.confidence
                );
                let event = Event::new(PhaseEvent::ClassificationReady(result)).stamped(generation);
                if let Err(rejected) = self.service.submit(event) {
                    debug!("HardwareLoop: classification not applied: {}", rejected.reason);
                }
            }
            Outcome::Answer(Err(e)) => {
                warn!("HardwareLoop: classifier failed: {}", e);
                self.report_failure(generation, e.into());
            }
            Outcome::TimedOut => {
                warn!("HardwareLoop: classifier gave no answer within {:?}", timeout);
                self.report_failure(generation, ClassificationFailure::Timeout);
            }
            Outcome::Interrupted(why) => self.abandon(generation, why),
        }
    }

    fn abandon(&mut self, generation: u64, why: Interrupt) {
        self.stats.abandoned += 1;
        let why = match why {
            Interrupt::Stopped => "loop stopping",
            Interrupt::Superseded => "phase moved on",
        };
        info!("HardwareLoop: classification at gen {} dropped ({})", generation, why);
    }

    fn report_failure(&mut self, generation: u64, reason: ClassificationFailure) {
        self.stats.classification_failures += 1;
        let event = Event::new(PhaseEvent::ClassificationFailed(reason)).stamped(generation);
        if let Err(rejected) = self.service.submit(event) {
            debug!("HardwareLoop: failure report not applied: {}", rejected.reason);
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Flag that ends the loop and any wait in progress when cleared.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

impl<S, C, K, I> HardwareLoop<S, C, K, I>
where
    S: SensorPort + Send + 'static,
    C: CameraPort + Send + 'static,
    K: ClassifierPort + Send + 'static,
    I: IndicatorPort + Send + 'static,
{
    /// Move the loop onto its own thread.
    pub fn spawn(mut self) -> Result<LoopHandle, Error> {
        let running = self.running();
        let flag = Arc::clone(&running);
        let period = self.service.config().poll_period();

        let join = spawn_worker("hardware-loop", DEFAULT_STACK_KB, move || {
            info!("HardwareLoop: polling every {:?}", period);
            while flag.load(Ordering::Acquire) {
                let started = Instant::now();
                self.cycle();
                if let Some(rest) = period.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
            info!("HardwareLoop: stopped after {} cycles", self.stats.cycles);
        })?;

        Ok(LoopHandle { running, join })
    }
}

pub struct LoopHandle {
    running: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl LoopHandle {
    /// Ask the loop to stop and wait for it.  A settle wait or classifier
    /// call in progress gives up within one watch tick.
    pub fn stop(self) {
        self.running.store(false, Ordering::Release);
        if self.join.join().is_err() {
            warn!("HardwareLoop: worker panicked");
        }
    }
}
