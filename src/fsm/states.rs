//! Per-phase enter/exit actions and the table builder.
//!
//! Each phase is a pair of plain `fn` pointers.  They only touch the
//! state; timing, I/O and notifications live outside the machine.
//!
//! ```text
//!  IDLE ──[object_detected]──▶ PROCESSING ──[classification_failed]──▶ ERROR
//!    ▲                              │                                   │
//!    │                   [classification_ready]                         │
//!    │                              ▼                                   │
//!    │                      USER_CONFIRMATION                           │
//!    │            [correct_bin]  [wrong_bin]  [confirmation_timeout]    │
//!    │                 ▼             ▼              ▼                   │
//!    │              REWARD       INCORRECT       TIMEOUT                │
//!    │                 │             │              │                   │
//!    └─────────────────┴─[auto_reset]┴──────────────┴───────────────────┘
//!
//!  Any phase ──[manual_reset]──▶ IDLE
//! ```

use super::context::SystemState;
use super::{Phase, PhaseDescriptor};
use crate::events::PhaseEvent;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the phase table.  Row `i` describes `Phase::from_index(i)`.
pub fn build_phase_table() -> [PhaseDescriptor; Phase::COUNT] {
    [
        PhaseDescriptor {
            phase: Phase::Idle,
            on_enter: Some(idle_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: Phase::Processing,
            on_enter: Some(processing_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: Phase::ShowResult,
            on_enter: None,
            on_exit: None,
        },
        PhaseDescriptor {
            phase: Phase::UserConfirmation,
            on_enter: Some(user_confirmation_enter),
            on_exit: Some(user_confirmation_exit),
        },
        PhaseDescriptor {
            phase: Phase::Reward,
            on_enter: Some(reward_enter),
            on_exit: Some(reward_exit),
        },
        PhaseDescriptor {
            phase: Phase::Incorrect,
            on_enter: Some(incorrect_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: Phase::Timeout,
            on_enter: None,
            on_exit: None,
        },
        PhaseDescriptor {
            phase: Phase::Error,
            on_enter: Some(error_enter),
            on_exit: None,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

/// A fresh cycle: nothing pending, every latched edge dropped.
fn idle_enter(state: &mut SystemState, _event: &PhaseEvent) {
    state.pending_classification = None;
    state.reward_granted = false;
    state.thrown = None;
    state.sensor_flags.clear();
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROCESSING
// ═══════════════════════════════════════════════════════════════════════════

fn processing_enter(state: &mut SystemState, _event: &PhaseEvent) {
    state.pending_classification = None;
}

// ═══════════════════════════════════════════════════════════════════════════
//  USER_CONFIRMATION
// ═══════════════════════════════════════════════════════════════════════════

fn user_confirmation_enter(state: &mut SystemState, event: &PhaseEvent) {
    if let PhaseEvent::ClassificationReady(result) = event {
        state.pending_classification = Some(*result);
        state.consecutive_failures = 0;
    }
}

fn user_confirmation_exit(state: &mut SystemState) {
    state.pending_classification = None;
}

// ═══════════════════════════════════════════════════════════════════════════
//  REWARD
// ═══════════════════════════════════════════════════════════════════════════

fn reward_enter(state: &mut SystemState, event: &PhaseEvent) {
    state.reward_granted = true;
    if let PhaseEvent::CorrectBin(bin) = event {
        state.thrown = Some(*bin);
    }
}

fn reward_exit(state: &mut SystemState) {
    state.reward_granted = false;
}

// ═══════════════════════════════════════════════════════════════════════════
//  INCORRECT
// ═══════════════════════════════════════════════════════════════════════════

fn incorrect_enter(state: &mut SystemState, event: &PhaseEvent) {
    if let PhaseEvent::WrongBin(bin) = event {
        state.thrown = Some(*bin);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(state: &mut SystemState, event: &PhaseEvent) {
    if let PhaseEvent::ClassificationFailed(reason) = event {
        state.last_failure = Some(*reason);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
    }
}
