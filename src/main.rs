//! iTrash station: host simulator entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  ManualSensors   SimCamera   SimClassifier   ConsoleIndicator│
//! │  (SensorPort)    (Camera)    (Classifier)    (Indicator)     │
//! │  DisplayRefresher  LogTransitionSink  DisposalLog  REST router│
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  AppService · StateStore · PhaseScheduler · Notifier   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  HardwareLoop (own thread) · keyboard loop (main thread)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys: `o` object, `b`/`y`/`r` blue/yellow/brown bin, `s` status,
//! `x` reset, `q` quit.  A line starting with `GET` or `POST` is sent
//! through the REST router, e.g. `POST /classify {"bin_color":"blue"}`.

use std::io::BufRead;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use itrash::adapters::config_file::JsonConfigFile;
use itrash::adapters::display::DisplayRefresher;
use itrash::adapters::http_api;
use itrash::adapters::sim::{
    ConsoleDisplay, ConsoleIndicator, ManualSensors, SimCamera, SimClassifier,
};
use itrash::sensors::SensorId;
use itrash::system::{Peripherals, System};

/// Simulated classifier round-trip.
const SIM_CLASSIFIER_LATENCY: Duration = Duration::from_millis(1500);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("iTrash v{} starting", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ITRASH_CONFIG").ok())
        .unwrap_or_else(|| "itrash.json".to_string());
    let config = JsonConfigFile::new(path).load_or_default()?;
    info!(
        "Config: poll={}ms confirm={}ms source={:?}",
        config.poll_period_ms, config.confirmation_timeout_ms, config.classification_source
    );

    let sensors = ManualSensors::new();
    let system = System::start(
        config,
        Peripherals {
            sensors: sensors.clone(),
            camera: SimCamera::new(),
            classifier: SimClassifier::new(SIM_CLASSIFIER_LATENCY),
            indicator: ConsoleIndicator::default(),
        },
    )?;
    let service = system.service().clone();
    service.subscribe("display", DisplayRefresher::new(ConsoleDisplay))?;

    info!("Ready. Keys: o b y r | s status | x reset | q quit");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.starts_with("GET") || line.starts_with("POST") {
            let mut parts = line.splitn(3, ' ');
            let method = parts.next().unwrap_or_default();
            let route = parts.next().unwrap_or_default();
            let body = parts.next().unwrap_or_default();
            let resp = http_api::route(&service, method, route, body);
            println!("{} {}", resp.status, resp.body);
            continue;
        }
        match line {
            "o" => sensors.pulse(SensorId::Object),
            "b" => sensors.pulse(SensorId::Blue),
            "y" => sensors.pulse(SensorId::Yellow),
            "r" => sensors.pulse(SensorId::Brown),
            "s" => println!("{}", serde_json::to_string_pretty(&service.get_status())?),
            "x" => {
                if let Err(rejected) = service.reset() {
                    warn!("Reset refused: {}", rejected.reason);
                }
            }
            "q" => break,
            "" => {}
            other => warn!("Unknown key '{}'", other),
        }
    }

    system.shutdown();
    Ok(())
}
