//! Log-based transition hook.
//!
//! Implements [`TransitionSink`] by writing one structured line per
//! accepted transition to the `log` facade.  Repeated classification
//! failures are only surfaced here; the core never escalates them.

use log::{info, warn};

use crate::app::ports::TransitionSink;
use crate::fsm::context::SystemSnapshot;

/// Subscriber that logs every transition.
pub struct LogTransitionSink {
    failure_alert_threshold: u32,
}

impl LogTransitionSink {
    pub fn new(failure_alert_threshold: u32) -> Self {
        Self {
            failure_alert_threshold,
        }
    }

    /// `true` when this transition is the one that reached the threshold
    /// (or went past it).
    fn should_alert(&self, old: &SystemSnapshot, new: &SystemSnapshot) -> bool {
        self.failure_alert_threshold > 0
            && new.consecutive_failures > old.consecutive_failures
            && new.consecutive_failures >= self.failure_alert_threshold
    }
}

impl TransitionSink for LogTransitionSink {
    fn on_transition(&mut self, old: &SystemSnapshot, new: &SystemSnapshot) {
        info!(
            "STATE | {} -> {} | gen={} | event={} | pending={} | reward={}",
            old.phase,
            new.phase,
            new.generation,
            new.last_event.map_or("-", |k| k.as_str()),
            new.pending_classification
                .map_or("-", |c| c.bin_color.as_str()),
            new.reward_granted,
        );

        if self.should_alert(old, new) {
            warn!(
                "FAULT | {} consecutive classification failures (last: {})",
                new.consecutive_failures,
                new.last_failure
                    .map_or_else(|| "unknown".to_string(), |f| f.to_string()),
            );
        }
    }
}
