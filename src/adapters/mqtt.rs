//! Pub/sub front-end: inbound topic router and outbound phase publisher.
//!
//! ```text
//!  broker ──▶ itrash/sensor/{object,blue,yellow,brown} ─┐
//!         ──▶ itrash/classify                           ├─▶ TopicRouter ─▶ AppService
//!         ──▶ itrash/reset                              │
//!         ──▶ itrash/status ────────────────────────────┘   └─▶ itrash/status/response
//!
//!  Notifier ─▶ BrokerPublisher ─▶ itrash/phase
//! ```
//!
//! The broker client itself lives behind [`MessagePublisher`]; this module
//! only knows topics and payloads.

use log::warn;
use serde::Serialize;
use serde_json::json;

use crate::app::commands::{AppCommand, CommandReply};
use crate::app::ports::{MessagePublisher, TransitionSink};
use crate::app::service::AppService;
use crate::fsm::Phase;
use crate::fsm::context::SystemSnapshot;
use crate::sensors::{BinColor, SensorId};

pub const TOPIC_SENSOR_PREFIX: &str = "itrash/sensor/";
pub const TOPIC_CLASSIFY: &str = "itrash/classify";
pub const TOPIC_RESET: &str = "itrash/reset";
pub const TOPIC_STATUS: &str = "itrash/status";
pub const TOPIC_STATUS_RESPONSE: &str = "itrash/status/response";
pub const TOPIC_PHASE: &str = "itrash/phase";

/// Topics the broker client should subscribe to.
pub const INBOUND_TOPICS: [&str; 4] = ["itrash/sensor/+", TOPIC_CLASSIFY, TOPIC_RESET, TOPIC_STATUS];

/// A message to publish in response to an inbound one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: &'static str,
    pub payload: String,
}

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Dispatches inbound messages to the service.
pub struct TopicRouter {
    service: AppService,
}

impl TopicRouter {
    pub fn new(service: AppService) -> Self {
        Self { service }
    }

    /// Handle one message.  Returns the reply to publish, if the topic
    /// has one.
    pub fn handle(&self, topic: &str, payload: &str) -> Option<Outbound> {
        let Some(cmd) = Self::parse(topic, payload) else {
            warn!("MQTT: ignoring '{}' ({} bytes)", topic, payload.len());
            return None;
        };
        let reply = self.service.handle_command(cmd);
        if reply.is_rejected() {
            warn!("MQTT: '{}' rejected", topic);
        }
        match cmd {
            AppCommand::GetStatus => Some(Outbound {
                topic: TOPIC_STATUS_RESPONSE,
                payload: status_payload(&reply),
            }),
            _ => None,
        }
    }

    fn parse(topic: &str, payload: &str) -> Option<AppCommand> {
        if let Some(name) = topic.strip_prefix(TOPIC_SENSOR_PREFIX) {
            return name.parse::<SensorId>().ok().map(AppCommand::TriggerSensor);
        }
        match topic {
            TOPIC_RESET => Some(AppCommand::Reset),
            TOPIC_STATUS => Some(AppCommand::GetStatus),
            TOPIC_CLASSIFY => Self::parse_classify(payload),
            _ => None,
        }
    }

    /// Accepts a bare colour or material name, or
    /// `{"bin_color": "...", "confidence": 0.9}`.
    fn parse_classify(payload: &str) -> Option<AppCommand> {
        #[derive(serde::Deserialize)]
        struct Body {
            bin_color: BinColor,
            confidence: Option<f32>,
        }

        let payload = payload.trim();
        let (bin_color, confidence) = if payload.starts_with('{') {
            let body: Body = serde_json::from_str(payload).ok()?;
            (body.bin_color, body.confidence.unwrap_or(1.0))
        } else {
            let bin = payload
                .parse::<BinColor>()
                .ok()
                .or_else(|| BinColor::for_material(payload))?;
            (bin, 1.0)
        };
        Some(AppCommand::SubmitClassification {
            bin_color,
            confidence,
        })
    }
}

fn status_payload(reply: &CommandReply) -> String {
    serde_json::to_string(reply).unwrap_or_else(|_| json!({ "error": "encode" }).to_string())
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PhaseMessage<'a> {
    from: Phase,
    to: Phase,
    generation: u64,
    state: &'a SystemSnapshot,
}

/// Notifier subscriber posting every transition on [`TOPIC_PHASE`].
pub struct BrokerPublisher<P> {
    publisher: P,
    failed: u64,
}

impl<P: MessagePublisher> BrokerPublisher<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            failed: 0,
        }
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

impl<P: MessagePublisher> TransitionSink for BrokerPublisher<P> {
    fn on_transition(&mut self, old: &SystemSnapshot, new: &SystemSnapshot) {
        let msg = PhaseMessage {
            from: old.phase,
            to: new.phase,
            generation: new.generation,
            state: new,
        };
        let Ok(payload) = serde_json::to_string(&msg) else {
            return;
        };
        if let Err(e) = self.publisher.publish(TOPIC_PHASE, &payload) {
            self.failed += 1;
            warn!("MQTT: publish of gen {} failed: {}", new.generation, e);
        }
    }
}
