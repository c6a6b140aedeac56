//! Integration tests for the REST and messaging front-ends plus the
//! display and broker subscribers, all against one running core.

use std::time::{Duration, Instant};

use itrash::adapters::display::DisplayRefresher;
use itrash::adapters::http_api;
use itrash::adapters::mqtt::{
    BrokerPublisher, TOPIC_PHASE, TOPIC_STATUS_RESPONSE, TopicRouter,
};
use itrash::config::SystemConfig;
use itrash::fsm::Phase;
use itrash::system::System;
use serde_json::Value;

use super::mock_hw::{RecordingBroker, RecordingDisplay};

fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

// ── REST ──────────────────────────────────────────────────────

#[test]
fn rest_walks_a_full_disposal() {
    let system = System::start_core(SystemConfig::default()).unwrap();
    let app = system.service();

    let resp = http_api::route(app, "POST", "/sensor/object-detected", "");
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp.body)["state"]["phase"], "processing");

    let body = r#"{"material":"CARDBOARD","confidence":0.8}"#;
    let resp = http_api::route(app, "POST", "/classify", body);
    assert_eq!(resp.status, 200);
    let state = &json(&resp.body)["state"];
    assert_eq!(state["pending_classification"]["bin_color"], "blue");

    let resp = http_api::route(app, "POST", "/sensor/blue", "");
    assert_eq!(resp.status, 200);
    let body = json(&resp.body);
    assert_eq!(body["result"], "accepted");
    assert_eq!(body["state"]["phase"], "reward");
    assert_eq!(body["state"]["reward_granted"], true);

    let resp = http_api::route(app, "GET", "/status", "");
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp.body)["state"]["phase"], "reward");

    system.shutdown();
}

#[test]
fn rest_reports_conflicts_and_bad_payloads() {
    let system = System::start_core(SystemConfig::default()).unwrap();
    let app = system.service();

    // Nothing to classify while idle.
    let resp = http_api::route(app, "POST", "/classify", r#"{"bin_color":"brown"}"#);
    assert_eq!(resp.status, 409);
    let body = json(&resp.body);
    assert_eq!(body["result"], "rejected");
    assert_eq!(body["reason"], "invalid_transition");
    assert_eq!(body["state"]["phase"], "idle");

    http_api::route(app, "POST", "/sensor/object-detected", "");
    let body = r#"{"bin_color":"brown","confidence":7}"#;
    let resp = http_api::route(app, "POST", "/classify", body);
    assert_eq!(resp.status, 400);
    assert_eq!(json(&resp.body)["reason"], "invalid_payload");

    let resp = http_api::route(app, "POST", "/reset", "");
    assert_eq!(resp.status, 200);
    assert_eq!(app.get_status().phase, Phase::Idle);

    system.shutdown();
}

// ── Messaging ─────────────────────────────────────────────────

#[test]
fn mqtt_topics_drive_the_same_core() {
    let system = System::start_core(SystemConfig::default()).unwrap();
    let router = TopicRouter::new(system.service().clone());

    assert!(router.handle("itrash/sensor/object", "").is_none());
    assert!(router.handle("itrash/classify", "METAL").is_none());
    assert_eq!(system.service().get_status().phase, Phase::UserConfirmation);

    let reply = router.handle("itrash/status", "").unwrap();
    assert_eq!(reply.topic, TOPIC_STATUS_RESPONSE);
    let body = json(&reply.payload);
    assert_eq!(body["state"]["phase"], "user_confirmation");
    assert_eq!(body["state"]["pending_classification"]["bin_color"], "yellow");

    router.handle("itrash/sensor/brown", "");
    assert_eq!(system.service().get_status().phase, Phase::Incorrect);

    router.handle("itrash/reset", "");
    assert_eq!(system.service().get_status().phase, Phase::Idle);

    system.shutdown();
}

// ── Subscribers ───────────────────────────────────────────────

#[test]
fn display_and_broker_follow_transitions() {
    let system = System::start_core(SystemConfig::default()).unwrap();
    let app = system.service();

    let display = RecordingDisplay::default();
    let broker = RecordingBroker::default();
    app.subscribe("test-display", DisplayRefresher::new(display.clone()))
        .unwrap();
    app.subscribe("test-broker", BrokerPublisher::new(broker.clone()))
        .unwrap();

    http_api::route(app, "POST", "/sensor/object-detected", "");
    http_api::route(app, "POST", "/classify", r#"{"bin_color":"brown"}"#);
    http_api::route(app, "POST", "/sensor/brown", "");
    http_api::route(app, "POST", "/reset", "");

    let deadline = Instant::now() + Duration::from_secs(3);
    while broker.sent.lock().unwrap().len() < 4 {
        assert!(Instant::now() < deadline, "broker missed transitions");
        std::thread::sleep(Duration::from_millis(5));
    }
    system.shutdown();

    assert_eq!(
        *display.images.lock().unwrap(),
        vec![
            "processing_new.png",
            "throw_brown.png",
            "reward_received_new.png",
            "white.png"
        ]
    );

    let sent = broker.sent.lock().unwrap();
    assert!(sent.iter().all(|(topic, _)| topic == TOPIC_PHASE));
    let phases: Vec<String> = sent
        .iter()
        .map(|(_, p)| json(p)["to"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(phases, ["processing", "user_confirmation", "reward", "idle"]);
}
