//! Fuzz target: phase transition table
//!
//! Decodes arbitrary bytes into stamped events and applies them to a
//! `PhaseMachine`, verifying:
//! - No panics under any event sequence
//! - Rejected events leave the state untouched
//! - Accepted events bump the generation by exactly one
//! - `pending_classification` only exists while processing or confirming
//! - `reward_granted` is set exactly while in `reward`
//!
//! cargo fuzz run fuzz_phase_events

#![no_main]

use libfuzzer_sys::fuzz_target;
use itrash::error::ClassificationFailure;
use itrash::events::{Event, PhaseEvent};
use itrash::fsm::context::{Classification, SystemState};
use itrash::fsm::{Phase, PhaseMachine};
use itrash::sensors::{BinColor, SensorId};

fn color(b: u8) -> BinColor {
    BinColor::ALL[(b % 3) as usize]
}

/// Two bytes per event: kind + argument.
fn decode(kind: u8, arg: u8, state: &SystemState) -> Event {
    let what = match kind % 8 {
        0 => PhaseEvent::ObjectDetected,
        1 => PhaseEvent::ClassificationReady(Classification {
            bin_color: color(arg),
            confidence: f32::from(arg) / 255.0,
        }),
        2 => PhaseEvent::ClassificationFailed(ClassificationFailure::Timeout),
        3 => PhaseEvent::CorrectBin(color(arg)),
        4 => PhaseEvent::WrongBin(color(arg)),
        5 => PhaseEvent::ConfirmationTimeout,
        6 => PhaseEvent::AutoReset,
        _ => PhaseEvent::ManualReset,
    };
    let mut event = Event::new(what);
    // High bit: stamp, sometimes with a stale generation.
    if kind & 0x80 != 0 {
        let lag = u64::from(kind & 0x01);
        event = event.stamped(state.generation.saturating_sub(lag));
    }
    if kind & 0x40 != 0 {
        event = event.from_sensor(SensorId::ALL[(arg % 4) as usize]);
    }
    event
}

fuzz_target!(|data: &[u8]| {
    let machine = PhaseMachine::new();
    let mut state = SystemState::new();

    for pair in data.chunks_exact(2) {
        let event = decode(pair[0], pair[1], &state);
        let before = state;
        match machine.apply(&mut state, &event) {
            Ok(from) => {
                assert_eq!(from, before.phase);
                assert_eq!(state.generation, before.generation + 1);
            }
            Err(_) => assert_eq!(state, before),
        }
        if state.pending_classification.is_some() {
            assert!(matches!(
                state.phase,
                Phase::Processing | Phase::ShowResult | Phase::UserConfirmation
            ));
        }
        assert_eq!(state.reward_granted, state.phase == Phase::Reward);
    }
});
