//! Edge detector for the proximity sensors.
//!
//! Converts level samples into one-shot "fired" events.  A sensor fires on
//! the low → high transition only; it must be read low at least once
//! before it can fire again, however long it stays high.
//!
//! ```text
//!  level   ___/‾‾‾‾‾‾‾\___/‾‾\___
//!  fired      ^           ^
//! ```
//!
//! The debouncer owns no I/O and no clock: it is a pure function of the
//! current sample and the previous one.

use heapless::Vec;

use super::{SensorId, SensorLevels};

/// Sensors that fired in a single poll (at most one entry per sensor).
pub type Fired = Vec<SensorId, { SensorId::COUNT }>;

#[derive(Debug, Clone, Default)]
pub struct SensorDebouncer {
    last: SensorLevels,
}

impl SensorDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known sample so sensors already high at boot do not
    /// fire until they have been released once.
    pub fn primed(levels: SensorLevels) -> Self {
        Self { last: levels }
    }

    /// Feed one sample; returns the sensors that rose since the last one.
    pub fn poll(&mut self, levels: &SensorLevels) -> Fired {
        let mut fired = Fired::new();
        for (id, level) in levels.iter() {
            if level && !self.last.get(id) {
                // Capacity equals the number of sensors, cannot overflow.
                let _ = fired.push(id);
            }
        }
        self.last = *levels;
        fired
    }

    /// Forget history; every sensor is treated as released.
    pub fn reset(&mut self) {
        self.last = SensorLevels::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high(id: SensorId) -> SensorLevels {
        SensorLevels::default().with(id, true)
    }

    #[test]
    fn held_level_fires_once() {
        let mut d = SensorDebouncer::new();
        assert_eq!(d.poll(&high(SensorId::Object)).as_slice(), &[SensorId::Object]);
        assert!(d.poll(&high(SensorId::Object)).is_empty());
        assert!(d.poll(&high(SensorId::Object)).is_empty());
    }

    #[test]
    fn release_rearms() {
        let mut d = SensorDebouncer::new();
        d.poll(&high(SensorId::Blue));
        assert!(d.poll(&SensorLevels::default()).is_empty());
        assert_eq!(d.poll(&high(SensorId::Blue)).as_slice(), &[SensorId::Blue]);
    }

    #[test]
    fn simultaneous_edges_all_reported() {
        let mut d = SensorDebouncer::new();
        let both = high(SensorId::Blue).with(SensorId::Brown, true);
        assert_eq!(d.poll(&both).as_slice(), &[SensorId::Blue, SensorId::Brown]);
    }

    #[test]
    fn primed_high_sensor_waits_for_release() {
        let mut d = SensorDebouncer::primed(high(SensorId::Object));
        assert!(d.poll(&high(SensorId::Object)).is_empty());
        d.poll(&SensorLevels::default());
        assert_eq!(d.poll(&high(SensorId::Object)).len(), 1);
    }

    #[test]
    fn reset_forgets_history() {
        let mut d = SensorDebouncer::new();
        d.poll(&high(SensorId::Yellow));
        d.reset();
        assert_eq!(d.poll(&high(SensorId::Yellow)).len(), 1);
    }
}
