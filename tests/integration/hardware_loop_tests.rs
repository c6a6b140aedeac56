//! Integration tests for the sensor → debouncer → classifier pipeline.
//!
//! Most tests step the loop by hand with `cycle()` so every sample is
//! deterministic; the last one runs it on its own thread.

use std::time::{Duration, Instant};

use itrash::app::ports::{CameraError, ClassifierError};
use itrash::config::{ClassificationSource, SystemConfig};
use itrash::drivers::led_patterns::{COLOUR_GREEN, COLOUR_RED};
use itrash::error::ClassificationFailure;
use itrash::fsm::Phase;
use itrash::fsm::context::Classification;
use itrash::hardware_loop::HardwareLoop;
use itrash::sensors::{BinColor, SensorId, SensorLevels};
use itrash::system::{Peripherals, System};

use super::mock_hw::{
    MockCamera, MockClassifier, RecordingIndicator, ScriptedSensors, Verdict,
};

fn test_config() -> SystemConfig {
    SystemConfig {
        object_settle_ms: 0,
        classifier_timeout_ms: 50,
        ..SystemConfig::default()
    }
}

fn blue() -> Classification {
    Classification::new(BinColor::Blue, 0.92).unwrap()
}

type Loop = HardwareLoop<ScriptedSensors, MockCamera, MockClassifier, RecordingIndicator>;

fn make_loop(
    system: &System,
    classifier: MockClassifier,
    camera: MockCamera,
) -> (Loop, ScriptedSensors, RecordingIndicator) {
    let sensors = ScriptedSensors::new();
    let indicator = RecordingIndicator::default();
    let hw = HardwareLoop::new(
        system.service().clone(),
        sensors.clone(),
        camera,
        classifier,
        indicator.clone(),
    );
    (hw, sensors, indicator)
}

/// Prime the debouncer with an all-low sample.
fn prime(hw: &mut Loop, sensors: &ScriptedSensors) {
    sensors.push_low();
    hw.cycle();
}

fn pulse(hw: &mut Loop, sensors: &ScriptedSensors, id: SensorId) {
    sensors.push_high(id);
    hw.cycle();
    sensors.push_low();
    hw.cycle();
}

// ── Edges ─────────────────────────────────────────────────────

#[test]
fn sensor_high_at_boot_does_not_fire() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, _) =
        make_loop(&system, MockClassifier::answering(blue()), MockCamera::default());

    sensors.push_high(SensorId::Object);
    sensors.push_high(SensorId::Object);
    hw.cycle();
    hw.cycle();
    assert_eq!(system.service().get_status().phase, Phase::Idle);
    assert_eq!(hw.stats().edges, 0);

    // Released, then pressed again: a real rising edge counts.
    sensors.push_low();
    hw.cycle();
    assert_eq!(hw.stats().edges, 0);
    pulse(&mut hw, &sensors, SensorId::Object);
    assert_eq!(hw.stats().edges, 1);
    assert_eq!(system.service().get_status().phase, Phase::UserConfirmation);

    system.shutdown();
}

#[test]
fn held_sensor_fires_once() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, _) =
        make_loop(&system, MockClassifier::answering(blue()), MockCamera::default());
    prime(&mut hw, &sensors);

    for _ in 0..5 {
        sensors.push_high(SensorId::Object);
        hw.cycle();
    }
    assert_eq!(hw.stats().edges, 1);
    assert_eq!(system.service().get_status().generation, 2); // object + classification

    system.shutdown();
}

// ── Full cycle ────────────────────────────────────────────────

#[test]
fn object_then_matching_bin_rewards() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, indicator) =
        make_loop(&system, MockClassifier::answering(blue()), MockCamera::default());
    prime(&mut hw, &sensors);

    pulse(&mut hw, &sensors, SensorId::Object);
    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::UserConfirmation);
    assert_eq!(s.pending_classification, Some(blue()));
    assert!(!s.sensor_flags.object, "consumed edge must be cleared");

    sensors.push_high(SensorId::Blue);
    hw.cycle();
    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Reward);
    assert!(s.reward_granted);
    assert_eq!(indicator.last(), Some((Phase::Reward, COLOUR_GREEN)));
    assert_eq!(hw.stats().classifications, 1);

    system.shutdown();
}

#[test]
fn bin_sensor_while_idle_is_ignored_by_the_table() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, _) =
        make_loop(&system, MockClassifier::answering(blue()), MockCamera::default());
    prime(&mut hw, &sensors);

    pulse(&mut hw, &sensors, SensorId::Yellow);
    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Idle);
    assert_eq!(s.generation, 0);
    assert!(s.sensor_flags.yellow, "rejected edge stays latched until idle is re-entered");

    system.shutdown();
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn classifier_error_moves_to_error_phase() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, _) = make_loop(
        &system,
        MockClassifier::with(Verdict::Fail(ClassifierError::UnknownMaterial)),
        MockCamera::default(),
    );
    prime(&mut hw, &sensors);

    pulse(&mut hw, &sensors, SensorId::Object);
    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Error);
    assert_eq!(s.last_failure, Some(ClassificationFailure::UnknownMaterial));
    assert_eq!(s.consecutive_failures, 1);
    assert_eq!(hw.stats().classification_failures, 1);

    system.shutdown();
}

#[test]
fn slow_classifier_is_bounded_by_timeout() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, _) =
        make_loop(&system, MockClassifier::with(Verdict::Hang), MockCamera::default());
    prime(&mut hw, &sensors);

    let started = Instant::now();
    sensors.push_high(SensorId::Object);
    hw.cycle();
    assert!(started.elapsed() < Duration::from_secs(5));

    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Error);
    assert_eq!(s.last_failure, Some(ClassificationFailure::Timeout));

    system.shutdown();
}

#[test]
fn missing_camera_is_a_classification_failure() {
    let system = System::start_core(test_config()).unwrap();
    let classifier = MockClassifier::answering(blue());
    let calls = classifier.calls.clone();
    let camera = MockCamera {
        fail: Some(CameraError::Unavailable),
        ..MockCamera::default()
    };
    let (mut hw, sensors, _) = make_loop(&system, classifier, camera);
    prime(&mut hw, &sensors);

    pulse(&mut hw, &sensors, SensorId::Object);
    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Error);
    assert_eq!(s.last_failure, Some(ClassificationFailure::CameraUnavailable));
    assert_eq!(*calls.lock().unwrap(), 0);

    system.shutdown();
}

#[test]
fn read_failure_does_not_stop_the_loop() {
    let system = System::start_core(test_config()).unwrap();
    let (mut hw, sensors, indicator) =
        make_loop(&system, MockClassifier::answering(blue()), MockCamera::default());
    prime(&mut hw, &sensors);

    sensors.push_failure();
    hw.cycle();
    assert_eq!(hw.stats().read_errors, 1);
    assert_eq!(indicator.last(), Some((Phase::Idle, COLOUR_RED)));

    pulse(&mut hw, &sensors, SensorId::Object);
    assert_eq!(system.service().get_status().phase, Phase::UserConfirmation);

    system.shutdown();
}

// ── External classification ───────────────────────────────────

#[test]
fn external_mode_waits_for_submitted_result() {
    let config = SystemConfig {
        classification_source: ClassificationSource::External,
        ..test_config()
    };
    let system = System::start_core(config).unwrap();
    let classifier = MockClassifier::answering(blue());
    let calls = classifier.calls.clone();
    let (mut hw, sensors, _) = make_loop(&system, classifier, MockCamera::default());
    prime(&mut hw, &sensors);

    pulse(&mut hw, &sensors, SensorId::Object);
    assert_eq!(system.service().get_status().phase, Phase::Processing);
    assert_eq!(*calls.lock().unwrap(), 0);

    system
        .service()
        .submit_classification_result(BinColor::Brown, 0.75)
        .unwrap();
    sensors.push(SensorLevels::default().with(SensorId::Brown, true));
    hw.cycle();
    assert_eq!(system.service().get_status().phase, Phase::Reward);

    system.shutdown();
}

// ── Threaded ──────────────────────────────────────────────────

#[test]
fn spawned_loop_reaches_confirmation() {
    let sensors = ScriptedSensors::new();
    sensors.push_low();
    sensors.push_high(SensorId::Object);

    let config = SystemConfig {
        poll_period_ms: 10,
        ..test_config()
    };
    let system = System::start(
        config,
        Peripherals {
            sensors: sensors.clone(),
            camera: MockCamera::default(),
            classifier: MockClassifier::answering(blue()),
            indicator: RecordingIndicator::default(),
        },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    while system.service().get_status().phase != Phase::UserConfirmation {
        assert!(Instant::now() < deadline, "loop never classified");
        std::thread::sleep(Duration::from_millis(5));
    }

    system.shutdown();
}

// ── Interruption ──────────────────────────────────────────────

#[test]
fn reset_during_classification_abandons_it() {
    let system = System::start_core(SystemConfig {
        classifier_timeout_ms: 10_000,
        ..test_config()
    })
    .unwrap();
    let (mut hw, sensors, _) =
        make_loop(&system, MockClassifier::with(Verdict::Hang), MockCamera::default());
    prime(&mut hw, &sensors);

    let app = system.service().clone();
    let resetter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        app.reset().unwrap();
    });

    let started = Instant::now();
    sensors.push_high(SensorId::Object);
    hw.cycle();
    assert!(started.elapsed() < Duration::from_secs(3));
    resetter.join().unwrap();

    let s = system.service().get_status();
    assert_eq!(s.phase, Phase::Idle);
    assert_eq!(s.last_failure, None);
    assert_eq!(hw.stats().abandoned, 1);
    assert_eq!(hw.stats().classification_failures, 0);

    system.shutdown();
}

fn start_stuck_in_processing(config: SystemConfig, classifier: MockClassifier) -> System {
    let sensors = ScriptedSensors::new();
    sensors.push_low();
    sensors.push_high(SensorId::Object);
    let system = System::start(
        SystemConfig {
            poll_period_ms: 10,
            ..config
        },
        Peripherals {
            sensors,
            camera: MockCamera::default(),
            classifier,
            indicator: RecordingIndicator::default(),
        },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    while system.service().get_status().phase != Phase::Processing {
        assert!(Instant::now() < deadline, "object never detected");
        std::thread::sleep(Duration::from_millis(5));
    }
    system
}

#[test]
fn shutdown_interrupts_a_hung_classifier() {
    let classifier = MockClassifier::with(Verdict::Hang);
    let calls = classifier.calls.clone();
    let system = start_stuck_in_processing(
        SystemConfig {
            classifier_timeout_ms: 10_000,
            ..test_config()
        },
        classifier,
    );

    let deadline = Instant::now() + Duration::from_secs(3);
    while *calls.lock().unwrap() == 0 {
        assert!(Instant::now() < deadline, "classifier never called");
        std::thread::sleep(Duration::from_millis(5));
    }

    let started = Instant::now();
    system.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn shutdown_interrupts_the_settle_wait() {
    let classifier = MockClassifier::answering(blue());
    let calls = classifier.calls.clone();
    let system = start_stuck_in_processing(
        SystemConfig {
            object_settle_ms: 10_000,
            ..test_config()
        },
        classifier,
    );

    let started = Instant::now();
    system.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(*calls.lock().unwrap(), 0);
}
