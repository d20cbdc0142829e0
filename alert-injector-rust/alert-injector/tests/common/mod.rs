#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alert_injector::infrastructure::clock::{Clock, ManualClock};
use alert_injector::infrastructure::config::Config;
use serde_json::{json, Value};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const PUSH_PATH: &str = "/metrics/job/alert_test/instance/test-service";
pub const ALERTS_PATH: &str = "/api/v2/alerts";

pub fn config_for(pushgateway: &MockServer, alertmanager: &MockServer) -> Config {
    Config {
        pushgateway_url: Config::parse_base_url(&pushgateway.uri()).unwrap(),
        alertmanager_url: Config::parse_base_url(&alertmanager.uri()).unwrap(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn config_with_pushgateway(url: &str) -> Config {
    Config {
        pushgateway_url: Config::parse_base_url(url).unwrap(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn config_with_alertmanager(url: &str) -> Config {
    Config {
        alertmanager_url: Config::parse_base_url(url).unwrap(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

/// Nothing listens on port 1, so connecting fails immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn manual_clock() -> (Arc<ManualClock>, Arc<dyn Clock>) {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    (clock, dyn_clock)
}

pub fn alert_json(name: &str, labels: &[(&str, &str)], annotations: &[&str], state: &str) -> Value {
    let mut label_map = serde_json::Map::new();
    label_map.insert("alertname".to_string(), json!(name));
    for (key, value) in labels {
        label_map.insert(key.to_string(), json!(value));
    }
    let mut annotation_map = serde_json::Map::new();
    for key in annotations {
        annotation_map.insert(key.to_string(), json!(format!("{key} for {name}")));
    }
    json!({
        "labels": label_map,
        "annotations": annotation_map,
        "status": {"state": state, "silencedBy": [], "inhibitedBy": []},
        "fingerprint": format!("fp-{name}"),
        "startsAt": "2026-02-10T00:00:00.000Z",
        "endsAt": "2026-02-10T01:00:00.000Z",
        "receivers": [{"name": "default"}]
    })
}

pub fn high_error_rate_alert() -> Value {
    alert_json(
        "HighErrorRate",
        &[("service", "test-service"), ("severity", "critical")],
        &["summary", "description"],
        "active",
    )
}

/// Serves `alerts` once the clock passes `appears_at`, an empty list before.
pub struct AlertsAfter {
    pub clock: Arc<ManualClock>,
    pub appears_at: Duration,
    pub alerts: Value,
}

impl Respond for AlertsAfter {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.clock.elapsed() >= self.appears_at {
            ResponseTemplate::new(200).set_body_json(self.alerts.clone())
        } else {
            ResponseTemplate::new(200).set_body_json(json!([]))
        }
    }
}

/// Accepts pushes with 202 and remembers when the first one arrived.
pub struct RecordingPushGateway {
    pub clock: Arc<ManualClock>,
    pub first_push: Arc<Mutex<Option<Duration>>>,
}

impl Respond for RecordingPushGateway {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut first = self.first_push.lock().unwrap();
        if first.is_none() {
            *first = Some(self.clock.elapsed());
        }
        ResponseTemplate::new(202)
    }
}

/// Reports `alerts` once `delay` has passed since the first recorded push.
pub struct AlertsAfterFirstPush {
    pub clock: Arc<ManualClock>,
    pub first_push: Arc<Mutex<Option<Duration>>>,
    pub delay: Duration,
    pub alerts: Value,
}

impl Respond for AlertsAfterFirstPush {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let first = *self.first_push.lock().unwrap();
        match first {
            Some(first) if self.clock.elapsed() >= first + self.delay => {
                ResponseTemplate::new(200).set_body_json(self.alerts.clone())
            }
            _ => ResponseTemplate::new(200).set_body_json(json!([])),
        }
    }
}

pub async fn received_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

pub fn sample_value(payload: &str, series: &str) -> Option<f64> {
    payload
        .lines()
        .find(|line| line.starts_with(series))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
