//! Disposal analytics hook.
//!
//! Subscribes to the notifier and keeps, in memory only, a bounded ring of
//! completed disposals plus the most recent classification.  Front-ends
//! read it through [`AppService`](crate::app::service::AppService).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::Deque;
use serde::Serialize;

use crate::app::ports::TransitionSink;
use crate::fsm::Phase;
use crate::fsm::context::{Classification, SystemSnapshot};
use crate::sensors::BinColor;

/// Disposals kept before the oldest is evicted.
pub const DISPOSAL_HISTORY: usize = 32;

/// One finished throw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisposalRecord {
    pub expected: BinColor,
    pub thrown: BinColor,
    pub correct: bool,
    pub at_us: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisposalTotals {
    pub total: u64,
    pub correct: u64,
}

#[derive(Default)]
struct Ledger {
    recent: Deque<DisposalRecord, DISPOSAL_HISTORY>,
    last_classification: Option<Classification>,
    totals: DisposalTotals,
}

/// Shared handle; clones see the same ledger.
#[derive(Clone, Default)]
pub struct DisposalLog {
    ledger: Arc<Mutex<Ledger>>,
}

impl DisposalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber half, for [`Notifier::subscribe`](crate::notifier::Notifier::subscribe).
    pub fn sink(&self) -> DisposalSink {
        DisposalSink { log: self.clone() }
    }

    pub fn record(&self, old: &SystemSnapshot, new: &SystemSnapshot) {
        let mut ledger = self.lock();

        if new.phase == Phase::UserConfirmation {
            ledger.last_classification = new.pending_classification;
        }

        if old.phase != Phase::UserConfirmation
            || !matches!(new.phase, Phase::Reward | Phase::Incorrect)
        {
            return;
        }
        let (Some(pending), Some(thrown)) = (old.pending_classification, new.thrown) else {
            return;
        };
        let record = DisposalRecord {
            expected: pending.bin_color,
            thrown,
            correct: new.phase == Phase::Reward,
            at_us: new.last_updated_us,
        };
        if ledger.recent.is_full() {
            ledger.recent.pop_front();
        }
        // Room was made above.
        let _ = ledger.recent.push_back(record);
        ledger.totals.total += 1;
        if record.correct {
            ledger.totals.correct += 1;
        }
    }

    pub fn last_classification(&self) -> Option<Classification> {
        self.lock().last_classification
    }

    pub fn last_disposal(&self) -> Option<DisposalRecord> {
        self.lock().recent.back().copied()
    }

    /// Newest last.
    pub fn recent(&self) -> Vec<DisposalRecord> {
        self.lock().recent.iter().copied().collect()
    }

    pub fn totals(&self) -> DisposalTotals {
        self.lock().totals
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct DisposalSink {
    log: DisposalLog,
}

impl TransitionSink for DisposalSink {
    fn on_transition(&mut self, old: &SystemSnapshot, new: &SystemSnapshot) {
        self.log.record(old, new);
    }
}
