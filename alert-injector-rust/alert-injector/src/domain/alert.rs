use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const ALERT_NAME_LABEL: &str = "alertname";
pub const ACTIVE_STATE: &str = "active";

/// One entry of the alert manager's `GET /api/v2/alerts` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub silenced_by: Vec<String>,
    #[serde(default)]
    pub inhibited_by: Vec<String>,
}

impl Alert {
    pub fn name(&self) -> Option<&str> {
        self.labels.get(ALERT_NAME_LABEL).map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.status.state == ACTIVE_STATE
    }

    pub fn is_named(&self, alert_name: &str) -> bool {
        self.name() == Some(alert_name)
    }

    /// First expected label whose value differs from this alert's, as
    /// `(key, expected, actual)`.
    pub fn first_label_mismatch<'a>(
        &'a self,
        expected: &'a HashMap<String, String>,
    ) -> Option<(&'a str, &'a str, Option<&'a str>)> {
        // Sorted so that the reported mismatch is stable across runs
        let mut keys: Vec<&String> = expected.keys().collect();
        keys.sort();
        keys.into_iter().find_map(|key| {
            let expected_value = expected[key].as_str();
            let actual = self.labels.get(key).map(String::as_str);
            if actual == Some(expected_value) {
                None
            } else {
                Some((key.as_str(), expected_value, actual))
            }
        })
    }

    pub fn first_missing_annotation<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .find(|key| !self.annotations.contains_key(*key))
    }
}

/// Keep only alerts whose `status.state` is `active`.
pub fn active_only(alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.into_iter().filter(Alert::is_active).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert_manager_payload() -> serde_json::Value {
        json!([
            {
                "annotations": {"summary": "Error rate above 50%", "runbook_url": "http://runbooks/errors"},
                "endsAt": "2026-02-10T01:00:00.000Z",
                "fingerprint": "abc123",
                "receivers": [{"name": "default"}],
                "startsAt": "2026-02-10T00:00:00.000Z",
                "status": {"inhibitedBy": [], "silencedBy": [], "state": "active"},
                "updatedAt": "2026-02-10T00:00:00.000Z",
                "labels": {"alertname": "HighErrorRate", "service": "test-service", "severity": "critical"}
            },
            {
                "labels": {"alertname": "Watchdog"},
                "status": {"state": "suppressed"}
            },
            {
                "labels": {"alertname": "NoStatus"}
            }
        ])
    }

    #[test]
    fn test_parse_alert_manager_response() {
        let alerts: Vec<Alert> = serde_json::from_value(alert_manager_payload()).unwrap();
        assert_eq!(alerts.len(), 3);

        let first = &alerts[0];
        assert_eq!(first.name(), Some("HighErrorRate"));
        assert!(first.is_active());
        assert_eq!(first.fingerprint.as_deref(), Some("abc123"));
        assert!(first.starts_at.is_some());
        assert_eq!(first.annotations.len(), 2);

        assert!(!alerts[1].is_active());
        assert_eq!(alerts[2].status.state, "");
        assert!(alerts[2].annotations.is_empty());
    }

    #[test]
    fn test_active_only_drops_other_states() {
        let alerts: Vec<Alert> = serde_json::from_value(alert_manager_payload()).unwrap();
        let active = active_only(alerts);
        assert_eq!(active.len(), 1);
        assert!(active[0].is_named("HighErrorRate"));
    }

    #[test]
    fn test_label_and_annotation_checks() {
        let alerts: Vec<Alert> = serde_json::from_value(alert_manager_payload()).unwrap();
        let alert = &alerts[0];

        let mut expected = HashMap::new();
        expected.insert("service".to_string(), "test-service".to_string());
        assert!(alert.first_label_mismatch(&expected).is_none());

        expected.insert("severity".to_string(), "warning".to_string());
        assert_eq!(
            alert.first_label_mismatch(&expected),
            Some(("severity", "warning", Some("critical")))
        );

        assert_eq!(alert.first_missing_annotation(&["summary"]), None);
        assert_eq!(
            alert.first_missing_annotation(&["summary", "description"]),
            Some("description")
        );
    }
}
