//! Wiring: builds every component, starts the workers, tears them down.
//!
//! ```text
//!  start():  Notifier ─▶ StateStore ─▶ PhaseScheduler ─▶ AppService ─▶ HardwareLoop
//!                                                          │
//!                         subscribers: log · analytics ────┘ (+ caller's own)
//!
//!  shutdown(): stop loop ─▶ cancel timers ─▶ stop scheduler ─▶ drain notifier
//! ```
//!
//! The store is created once here and handed to everything by `Arc`;
//! nothing looks it up globally.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::adapters::analytics::DisposalLog;
use crate::adapters::log_sink::LogTransitionSink;
use crate::app::ports::{CameraPort, ClassifierPort, IndicatorPort, SensorPort};
use crate::app::service::AppService;
use crate::config::SystemConfig;
use crate::error::Error;
use crate::hardware_loop::{HardwareLoop, LoopHandle};
use crate::notifier::Notifier;
use crate::scheduler::PhaseScheduler;
use crate::store::StateStore;

/// Hardware-facing adapters the loop drives.
pub struct Peripherals<S, C, K, I> {
    pub sensors: S,
    pub camera: C,
    pub classifier: K,
    pub indicator: I,
}

/// A running station.
pub struct System {
    service: AppService,
    scheduler_thread: Option<JoinHandle<()>>,
    hardware: Option<LoopHandle>,
}

impl System {
    /// Build the core without a hardware loop.  Front-ends and tests can
    /// drive it directly through [`System::service`].
    pub fn start_core(config: SystemConfig) -> Result<Self, Error> {
        config.validate()?;

        let notifier = Arc::new(Notifier::new());
        let store = Arc::new(StateStore::new(Arc::clone(&notifier)));
        let (scheduler, scheduler_thread) = PhaseScheduler::start(store.clone())?;

        let analytics = DisposalLog::new();
        notifier.subscribe("log-hook", LogTransitionSink::new(config.failure_alert_threshold))?;
        notifier.subscribe("analytics", analytics.sink())?;

        let service = AppService::new(store, notifier, scheduler, config, analytics);
        info!("System: core started");
        Ok(Self {
            service,
            scheduler_thread: Some(scheduler_thread),
            hardware: None,
        })
    }

    /// Build the core and start the hardware loop over `peripherals`.
    pub fn start<S, C, K, I>(
        config: SystemConfig,
        peripherals: Peripherals<S, C, K, I>,
    ) -> Result<Self, Error>
    where
        S: SensorPort + Send + 'static,
        C: CameraPort + Send + 'static,
        K: ClassifierPort + Send + 'static,
        I: IndicatorPort + Send + 'static,
    {
        let mut system = Self::start_core(config)?;
        let hw = HardwareLoop::new(
            system.service.clone(),
            peripherals.sensors,
            peripherals.camera,
            peripherals.classifier,
            peripherals.indicator,
        );
        system.hardware = Some(hw.spawn()?);
        Ok(system)
    }

    pub fn service(&self) -> &AppService {
        &self.service
    }

    /// Stop every worker.  Subscribers see every transition published
    /// before this call.
    pub fn shutdown(mut self) {
        if let Some(hw) = self.hardware.take() {
            hw.stop();
        }
        let scheduler = self.service.scheduler();
        scheduler.stop();
        if let Some(thread) = self.scheduler_thread.take() {
            if thread.join().is_err() {
                warn!("System: scheduler thread panicked");
            }
        }
        self.service.notifier().shutdown();
        info!("System: shut down");
    }
}
