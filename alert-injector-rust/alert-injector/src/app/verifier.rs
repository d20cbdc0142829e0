use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use reqwest::{Client, Url};
use tracing::{debug, error, info, warn};

use crate::domain::alert::{self, Alert};
use crate::domain::error::{AlertTestError, Result};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::config::Config;

/// Reads active alerts from an alert manager and checks them.
pub struct AlertVerifier {
    client: Client,
    alertmanager_url: Url,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl AlertVerifier {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AlertTestError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            alertmanager_url: config.alertmanager_url.clone(),
            poll_interval: config.poll_interval,
            clock,
        })
    }

    pub fn alerts_url(&self) -> Result<Url> {
        let mut url = self.alertmanager_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AlertTestError::InvalidConfig(format!(
                    "Alert manager URL cannot be a base: {}",
                    self.alertmanager_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v2", "alerts"]);
        Ok(url)
    }

    /// `Ok(vec![])` means the query worked and nothing is active; a failed
    /// query is always an `Err`.
    pub async fn get_active_alerts(&self) -> Result<Vec<Alert>> {
        let url = self.alerts_url()?;
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("❌ Error fetching alerts: {}", e);
            AlertTestError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ Alert manager answered {} for {}", status.as_u16(), url);
            return Err(AlertTestError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| AlertTestError::Transport(e.to_string()))?;
        let alerts: Vec<Alert> = serde_json::from_str(&body).map_err(|e| {
            error!("❌ Could not parse alerts from {}: {}", url, e);
            AlertTestError::Decode(e.to_string())
        })?;

        let active = alert::active_only(alerts);
        debug!("{} active alerts", active.len());
        Ok(active)
    }

    /// Polls until `alert_name` is active, returning how long it took.
    ///
    /// Failed queries are logged and retried on the next cycle; they only
    /// surface in the `Timeout` error once the deadline passes.
    pub async fn wait_for_alert(&self, alert_name: &str, timeout: Duration) -> Result<Duration> {
        info!("⏳ Waiting for alert '{}' to fire (timeout: {}s)...", alert_name, timeout.as_secs());

        let start = self.clock.now();
        let mut last_query_error = None;

        while self.clock.elapsed_since(start) < timeout {
            match self.get_active_alerts().await {
                Ok(alerts) => {
                    last_query_error = None;
                    if let Some(found) = alerts.iter().find(|a| a.is_named(alert_name)) {
                        let elapsed = self.clock.elapsed_since(start);
                        info!("✅ Alert '{}' fired after {}s", alert_name, elapsed.as_secs());
                        if let Some(starts_at) = found.starts_at {
                            debug!("Alert '{}' active since {}", alert_name, starts_at.to_rfc3339());
                        }
                        return Ok(elapsed);
                    }
                    debug!("Alert '{}' not active yet", alert_name);
                }
                Err(e) => {
                    warn!("⚠️ Alert query failed, retrying: {}", e);
                    last_query_error = Some(e.to_string());
                }
            }

            self.clock.sleep(self.poll_interval).await;
        }

        let err = AlertTestError::Timeout {
            alert: alert_name.to_string(),
            waited: timeout,
            last_query_error,
        };
        error!("❌ {}", err);
        Err(err)
    }

    pub async fn find_active_alert(&self, alert_name: &str) -> Result<Alert> {
        self.get_active_alerts()
            .await?
            .into_iter()
            .find(|a| a.is_named(alert_name))
            .ok_or_else(|| {
                error!("❌ Alert '{}' not found", alert_name);
                AlertTestError::AlertNotFound(alert_name.to_string())
            })
    }

    /// Every expected label must match the first active `alert_name` exactly.
    pub async fn verify_alert_labels(
        &self,
        alert_name: &str,
        expected_labels: &HashMap<String, String>,
    ) -> Result<()> {
        info!("🔍 Verifying labels for alert '{}'...", alert_name);
        let alert = self.find_active_alert(alert_name).await?;

        if let Some((key, expected, actual)) = alert.first_label_mismatch(expected_labels) {
            let err = AlertTestError::LabelMismatch {
                alert: alert_name.to_string(),
                key: key.to_string(),
                expected: expected.to_string(),
                actual: actual.map(str::to_string),
            };
            error!("❌ {}", err);
            return Err(err);
        }

        info!("✅ All labels verified");
        Ok(())
    }

    /// Required annotation keys must be present; values are not compared.
    pub async fn verify_alert_annotations<S: AsRef<str>>(
        &self,
        alert_name: &str,
        required_annotations: &[S],
    ) -> Result<()> {
        info!("🔍 Verifying annotations for alert '{}'...", alert_name);
        let alert = self.find_active_alert(alert_name).await?;

        if let Some(key) = alert.first_missing_annotation(required_annotations) {
            let err = AlertTestError::MissingAnnotation {
                alert: alert_name.to_string(),
                key: key.to_string(),
            };
            error!("❌ {}", err);
            return Err(err);
        }

        info!("✅ All annotations present");
        Ok(())
    }
}
