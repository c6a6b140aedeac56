//! Generation-stamped phase timers.
//!
//! Every delayed transition (processing deadline, confirmation timeout,
//! auto-reset) is armed here with the generation it belongs to.  Only the
//! current phase ever needs a timer, so the scheduler keeps exactly one
//! deadline slot: arming a newer generation replaces whatever was pending
//! and the superseded timer is dropped on the spot.  Arming never queues,
//! so no amount of trigger/reset churn can back the scheduler up.
//!
//! ```text
//!  arm() ──────┐ newer generation wins
//!              ▼
//!        ┌───────────┐          ┌──────────────────────────────────────────┐
//!        │ slot      │          │  Scheduler thread                        │
//!        │ Mutex<    │◀─ take ──│  block_on(LocalExecutor::run(            │
//!        │  Option<  │          │    or(Signal::wait,                      │
//!        │  Timer>>  │          │       Timer::at(slot deadline))))        │
//!        └───────────┘          │      │ due                               │
//!  arm() / cancel_all() / stop()│      ▼                                   │
//!        └──── Signal ─────────▶│  fire(): epoch + generation ─▶ callback  │
//!                               └──────────────────────────────────────────┘
//! ```
//!
//! When the timer comes due the scheduler still asks its
//! [`GenerationSource`] for the live generation; if the store has moved
//! on, the fire is an inert no-op.  `cancel_all` empties the slot and bumps
//! an epoch so an arm racing with it is dropped too.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, info};

use crate::app::ports::GenerationSource;
use crate::error::Error;
use crate::worker::{DEFAULT_STACK_KB, spawn_worker};

// ═══════════════════════════════════════════════════════════════
//  Slot
// ═══════════════════════════════════════════════════════════════

pub type TimerCallback = Box<dyn FnOnce() + Send>;

struct TimerEntry {
    label: &'static str,
    due: Instant,
    generation: u64,
    epoch: u64,
    callback: TimerCallback,
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub armed: u64,
    pub fired: u64,
    /// Timers dropped because the generation had moved on, either when
    /// they came due or when a newer one took the slot.
    pub stale: u64,
    /// Timers dropped by `cancel_all`.
    pub cancelled: u64,
    /// Whether a timer is waiting in the slot.
    pub pending: bool,
}

struct Shared {
    slot: Mutex<Option<TimerEntry>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
    epoch: AtomicU64,
    stopping: AtomicBool,
    generations: Arc<dyn GenerationSource>,
    armed: AtomicU64,
    fired: AtomicU64,
    stale: AtomicU64,
    cancelled: AtomicU64,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Option<TimerEntry>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discard_cancelled(&self, entry: &TimerEntry) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        debug!("Scheduler: '{}' cancelled", entry.label);
    }

    fn discard_stale(&self, entry: &TimerEntry, current: u64) {
        self.stale.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Scheduler: '{}' stale (armed at gen {}, now {})",
            entry.label, entry.generation, current
        );
    }

    /// Put `entry` in the slot unless the held timer is for a newer
    /// generation.  Returns the loser, if any, and whether `entry` won.
    fn offer(&self, entry: TimerEntry) -> (Option<TimerEntry>, bool) {
        let mut slot = self.slot();
        if entry.epoch != self.epoch.load(Ordering::Acquire) {
            return (Some(entry), false);
        }
        match slot.as_ref() {
            Some(held) if held.generation > entry.generation => (Some(entry), false),
            _ => (slot.replace(entry), true),
        }
    }

    /// Take the slot's timer if it is due at `now`.
    fn take_due(&self, now: Instant) -> Option<TimerEntry> {
        self.slot().take_if(|entry| entry.due <= now)
    }

    fn next_due(&self) -> Option<Instant> {
        self.slot().as_ref().map(|entry| entry.due)
    }

    fn fire(&self, entry: TimerEntry) {
        if entry.epoch != self.epoch.load(Ordering::Acquire) {
            self.discard_cancelled(&entry);
            return;
        }
        let current = self.generations.current_generation();
        if current != entry.generation {
            self.discard_stale(&entry, current);
            return;
        }
        self.fired.fetch_add(1, Ordering::Relaxed);
        debug!("Scheduler: '{}' fired at gen {}", entry.label, current);
        (entry.callback)();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler handle
// ═══════════════════════════════════════════════════════════════

/// Cheap to clone; every clone talks to the same scheduler thread.
#[derive(Clone)]
pub struct PhaseScheduler {
    shared: Arc<Shared>,
}

impl PhaseScheduler {
    /// Start the scheduler thread.
    pub fn start(generations: Arc<dyn GenerationSource>) -> Result<(Self, JoinHandle<()>), Error> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            wake: Signal::new(),
            epoch: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            generations,
            armed: AtomicU64::new(0),
            fired: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = spawn_worker("phase-scheduler", DEFAULT_STACK_KB, move || {
            run_scheduler(&thread_shared);
        })?;
        Ok((Self { shared }, handle))
    }

    /// Run `callback` after `delay` if the store is still at `generation`.
    ///
    /// Replaces the pending timer unless that one belongs to a newer
    /// generation.  Returns whether this timer is now the pending one.
    pub fn arm(
        &self,
        label: &'static str,
        delay: Duration,
        generation: u64,
        callback: impl FnOnce() + Send + 'static,
    ) -> bool {
        let entry = TimerEntry {
            label,
            due: Instant::now() + delay,
            generation,
            epoch: self.shared.epoch.load(Ordering::Acquire),
            callback: Box::new(callback),
        };
        self.shared.armed.fetch_add(1, Ordering::Relaxed);

        let (loser, won) = self.shared.offer(entry);
        if let Some(loser) = loser {
            if loser.epoch == self.shared.epoch.load(Ordering::Acquire) {
                self.shared.discard_stale(&loser, generation.max(loser.generation));
            } else {
                self.shared.discard_cancelled(&loser);
            }
        }
        if won {
            debug!("Scheduler: armed '{}' for {:?} at gen {}", label, delay, generation);
            self.shared.wake.signal(());
        }
        won
    }

    /// Drop the pending timer and any arm racing with this call.
    pub fn cancel_all(&self) {
        let dropped = {
            let mut slot = self.shared.slot();
            self.shared.epoch.fetch_add(1, Ordering::AcqRel);
            slot.take()
        };
        if let Some(entry) = dropped {
            self.shared.discard_cancelled(&entry);
        }
        self.shared.wake.signal(());
    }

    /// Cancel everything and ask the scheduler thread to exit.  Never
    /// blocks.
    pub fn stop(&self) {
        self.shared.stopping.store(true, Ordering::Release);
        self.cancel_all();
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            armed: self.shared.armed.load(Ordering::Relaxed),
            fired: self.shared.fired.load(Ordering::Relaxed),
            stale: self.shared.stale.load(Ordering::Relaxed),
            cancelled: self.shared.cancelled.load(Ordering::Relaxed),
            pending: self.shared.slot().is_some(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler thread
// ═══════════════════════════════════════════════════════════════

async fn scheduler_loop(shared: &Shared) {
    while !shared.stopping.load(Ordering::Acquire) {
        let timer = shared.next_due().map_or_else(Timer::never, Timer::at);
        future::or(shared.wake.wait(), async {
            timer.await;
        })
        .await;

        // The slot may have been replaced since the timer was set up.
        if let Some(entry) = shared.take_due(Instant::now()) {
            shared.fire(entry);
        }
    }
}

fn run_scheduler(shared: &Shared) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    info!("Scheduler started");
    future::block_on(executor.run(scheduler_loop(shared)));
    info!("Scheduler stopped");
}
