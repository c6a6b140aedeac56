//! Fan-out of accepted transitions to subscribers.
//!
//! The store calls [`Notifier::publish`] at the tail of its critical
//! section.  Publishing never blocks: each subscriber has its own bounded
//! `embassy-sync` channel drained by a dedicated worker thread.  When a
//! subscriber falls behind and its queue is full, the notification is
//! dropped and counted; the warning is logged by the caller after the
//! store lock is released.
//!
//! ```text
//!                     ┌── queue[16] ──▶ worker ──▶ display refresher
//!  StateStore ──▶ publish ── queue[16] ──▶ worker ──▶ broker publisher
//!                     └── queue[16] ──▶ worker ──▶ log hook
//! ```
//!
//! Per-subscriber order matches the store's transition order because
//! publish runs while the store lock is held.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::TransitionSink;
use crate::error::Error;
use crate::fsm::context::SystemSnapshot;
use crate::worker::{DEFAULT_STACK_KB, spawn_worker};

/// Notifications a subscriber may lag behind before drops start.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 16;

pub type SubscriberId = u32;

/// Outcome of one [`Notifier::publish`].
#[derive(Debug, Default)]
pub struct Delivery {
    generation: u64,
    /// `(subscriber, dropped so far)` for every queue that was full.
    dropped: Vec<(&'static str, u64)>,
}

impl Delivery {
    pub fn all_queued(&self) -> bool {
        self.dropped.is_empty()
    }

    pub fn dropped_for(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dropped.iter().map(|(name, _)| *name)
    }

    /// Warn about every dropped notification.
    pub fn log(&self) {
        for (name, count) in &self.dropped {
            warn!(
                "Notifier: '{}' queue full, dropped gen {} ({} dropped so far)",
                name, self.generation, count
            );
        }
    }
}

enum Notice {
    Transition {
        old: SystemSnapshot,
        new: SystemSnapshot,
    },
    Close,
}

type Queue = Channel<CriticalSectionRawMutex, Notice, SUBSCRIBER_QUEUE_DEPTH>;

struct Subscriber {
    id: SubscriberId,
    name: &'static str,
    queue: Arc<Queue>,
    dropped: u64,
    worker: Option<JoinHandle<()>>,
}

/// Subscriber registry plus drop accounting.
pub struct Notifier {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU32,
    dropped_total: AtomicU64,
    delivered_total: AtomicU64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
            dropped_total: AtomicU64::new(0),
            delivered_total: AtomicU64::new(0),
        }
    }

    /// Register `sink` and start its worker.  It receives every
    /// transition published from now on.
    pub fn subscribe(
        &self,
        name: &'static str,
        sink: impl TransitionSink + 'static,
    ) -> Result<SubscriberId, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue: Arc<Queue> = Arc::new(Channel::new());
        let worker_queue = Arc::clone(&queue);
        let worker = spawn_worker(name, DEFAULT_STACK_KB, move || {
            run_subscriber(name, &worker_queue, sink);
        })?;

        self.lock().push(Subscriber {
            id,
            name,
            queue,
            dropped: 0,
            worker: Some(worker),
        });
        info!("Notifier: subscriber '{}' registered as #{}", name, id);
        Ok(id)
    }

    /// Queue `(old, new)` for every subscriber without blocking.
    ///
    /// Runs under the store lock, so it only counts drops; the caller
    /// logs the returned [`Delivery`] once the lock is released.
    pub fn publish(&self, old: &SystemSnapshot, new: &SystemSnapshot) -> Delivery {
        let mut delivery = Delivery {
            generation: new.generation,
            dropped: Vec::new(),
        };
        let mut subscribers = self.lock();
        for sub in subscribers.iter_mut() {
            let notice = Notice::Transition {
                old: *old,
                new: *new,
            };
            if sub.queue.try_send(notice).is_err() {
                sub.dropped += 1;
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                delivery.dropped.push((sub.name, sub.dropped));
            } else {
                self.delivered_total.fetch_add(1, Ordering::Relaxed);
            }
        }
        delivery
    }

    /// Notifications dropped for one subscriber.
    pub fn dropped(&self, id: SubscriberId) -> Option<u64> {
        self.lock().iter().find(|s| s.id == id).map(|s| s.dropped)
    }

    /// Notifications dropped across all subscribers.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// Notifications queued successfully across all subscribers.
    pub fn delivered_total(&self) -> u64 {
        self.delivered_total.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Let every worker drain its queue, then stop and join them.
    pub fn shutdown(&self) {
        let drained: Vec<Subscriber> = self.lock().drain(..).collect();
        for mut sub in drained {
            futures_lite::future::block_on(sub.queue.send(Notice::Close));
            if let Some(worker) = sub.worker.take() {
                if worker.join().is_err() {
                    warn!("Notifier: subscriber '{}' panicked", sub.name);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_subscriber(name: &'static str, queue: &Queue, mut sink: impl TransitionSink) {
    loop {
        match futures_lite::future::block_on(queue.receive()) {
            Notice::Transition { old, new } => sink.on_transition(&old, &new),
            Notice::Close => break,
        }
    }
    info!("Notifier: subscriber '{}' stopped", name);
}
