//! System configuration parameters
//!
//! All tunable parameters for the station.  Loaded once at startup
//! (see [`ConfigPort`](crate::app::ports::ConfigPort)) and immutable
//! afterwards.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::fsm::Phase;
use crate::sensors::SensorId;

/// Slack between the loop's classifier bound and the processing deadline.
pub const PROCESSING_GRACE: Duration = Duration::from_secs(1);

/// Where classification results come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// The hardware loop captures and classifies by itself.
    Internal,
    /// A front-end submits results; the loop only watches sensors.
    External,
}

/// GPIO binding for one proximity sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub id: SensorId,
    /// BCM pin number.
    pub pin: u8,
    /// Sensor pulls the line low when an object is present.
    pub active_low: bool,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Sensors ---
    pub sensors: Vec<SensorBinding>,

    // --- Timing ---
    /// Hardware loop period (milliseconds)
    pub poll_period_ms: u32,
    /// Wait between object detection and image capture (milliseconds)
    pub object_settle_ms: u32,
    /// Bounded wait for one classifier call (milliseconds)
    pub classifier_timeout_ms: u32,
    /// Time a user has to throw the item (milliseconds)
    pub confirmation_timeout_ms: u32,

    // --- Auto-reset dwell times ---
    pub reward_reset_ms: u32,
    pub incorrect_reset_ms: u32,
    pub timeout_reset_ms: u32,
    pub error_reset_ms: u32,

    // --- Classification ---
    pub classification_source: ClassificationSource,
    /// Consecutive failures before the log hook raises a warning
    pub failure_alert_threshold: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Sensors (BCM numbering, proximity sensors pull low)
            sensors: vec![
                SensorBinding { id: SensorId::Object, pin: 26, active_low: true },
                SensorBinding { id: SensorId::Blue, pin: 19, active_low: true },
                SensorBinding { id: SensorId::Yellow, pin: 12, active_low: true },
                SensorBinding { id: SensorId::Brown, pin: 16, active_low: true },
            ],

            // Timing
            poll_period_ms: 100, // 10 Hz
            object_settle_ms: 500,
            classifier_timeout_ms: 30_000,
            confirmation_timeout_ms: 10_000,

            // Dwell
            reward_reset_ms: 5_000,
            incorrect_reset_ms: 2_000,
            timeout_reset_ms: 3_000,
            error_reset_ms: 5_000,

            // Classification
            classification_source: ClassificationSource::Internal,
            failure_alert_threshold: 3,
        }
    }
}

impl SystemConfig {
    /// Reject values the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_period_ms must be > 0"));
        }
        if self.classifier_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("classifier_timeout_ms must be > 0"));
        }
        if self.confirmation_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("confirmation_timeout_ms must be > 0"));
        }
        if [
            self.reward_reset_ms,
            self.incorrect_reset_ms,
            self.timeout_reset_ms,
            self.error_reset_ms,
        ]
        .contains(&0)
        {
            return Err(ConfigError::ValidationFailed("auto-reset delays must be > 0"));
        }
        for id in SensorId::ALL {
            match self.sensors.iter().filter(|b| b.id == id).count() {
                0 => return Err(ConfigError::ValidationFailed("every sensor needs a binding")),
                1 => {}
                _ => return Err(ConfigError::ValidationFailed("duplicate sensor binding")),
            }
        }
        Ok(())
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms.into())
    }

    pub fn object_settle(&self) -> Duration {
        Duration::from_millis(self.object_settle_ms.into())
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms.into())
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms.into())
    }

    /// Longest `processing` may last before it is failed by the scheduler.
    ///
    /// One grace second past the loop's own bound, so an internal
    /// classifier timeout is always reported as such.
    pub fn processing_deadline(&self) -> Duration {
        self.object_settle() + self.classifier_timeout() + PROCESSING_GRACE
    }

    /// Dwell time before `auto_reset`, for phases that have one.
    pub fn auto_reset_delay(&self, phase: Phase) -> Option<Duration> {
        let ms = match phase {
            Phase::Reward => self.reward_reset_ms,
            Phase::Incorrect => self.incorrect_reset_ms,
            Phase::Timeout => self.timeout_reset_ms,
            Phase::Error => self.error_reset_ms,
            _ => return None,
        };
        Some(Duration::from_millis(ms.into()))
    }

    pub fn binding(&self, id: SensorId) -> Option<&SensorBinding> {
        self.sensors.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.poll_period_ms > 0);
        assert_eq!(c.binding(SensorId::Object).map(|b| b.pin), Some(26));
        assert_eq!(c.classification_source, ClassificationSource::Internal);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let c: SystemConfig =
            serde_json::from_str(r#"{"poll_period_ms": 50, "classification_source": "external"}"#)
                .unwrap();
        assert_eq!(c.poll_period_ms, 50);
        assert_eq!(c.classification_source, ClassificationSource::External);
        assert_eq!(c.error_reset_ms, SystemConfig::default().error_reset_ms);
        assert_eq!(c.sensors.len(), 4);
    }

    #[test]
    fn zero_period_rejected() {
        let c = SystemConfig {
            poll_period_ms: 0,
            ..SystemConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn duplicate_or_missing_binding_rejected() {
        let mut c = SystemConfig::default();
        c.sensors.push(SensorBinding { id: SensorId::Blue, pin: 5, active_low: false });
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.sensors.retain(|b| b.id != SensorId::Brown);
        assert!(c.validate().is_err());
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SystemConfig::default();
        assert!(
            c.poll_period() < c.object_settle(),
            "loop should poll faster than the settle delay"
        );
        assert!(c.processing_deadline() > c.classifier_timeout());
        assert!(c.auto_reset_delay(Phase::Idle).is_none());
        assert_eq!(c.auto_reset_delay(Phase::Error), Some(Duration::from_secs(5)));
    }
}
