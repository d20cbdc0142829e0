use std::sync::Arc;
use std::time::Duration;
use prometheus::proto::MetricFamily;
use reqwest::{Client, StatusCode, Url};
use tracing::{error, info, warn};

use crate::app::payloads::{self, ResourceType};
use crate::domain::error::{AlertTestError, Result};
use crate::domain::policy::FailurePolicy;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::config::Config;
use crate::utils::exposition;

pub const PUSH_JOB: &str = "alert_test";

/// Counters for one injection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub pushes_attempted: u32,
    pub pushes_accepted: u32,
    pub pushes_rejected: u32,
    /// Set when the failure policy stopped the loop before the deadline.
    pub aborted_by_policy: bool,
    pub elapsed: Duration,
}

impl InjectionReport {
    /// Every push accepted and the full duration covered.
    pub fn succeeded(&self) -> bool {
        self.pushes_rejected == 0 && !self.aborted_by_policy
    }
}

pub fn is_accepted(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::ACCEPTED
}

/// Pushes synthetic failure metrics to a push gateway.
pub struct AlertInjector {
    client: Client,
    pushgateway_url: Url,
    push_interval: Duration,
    failure_policy: FailurePolicy,
    clock: Arc<dyn Clock>,
}

impl AlertInjector {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AlertTestError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            pushgateway_url: config.pushgateway_url.clone(),
            push_interval: config.push_interval,
            failure_policy: config.failure_policy,
            clock,
        })
    }

    /// `{pushgateway}/metrics/job/alert_test/instance/{service}`
    pub fn push_url(&self, service: &str) -> Result<Url> {
        let mut url = self.pushgateway_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AlertTestError::InvalidConfig(format!(
                    "Push gateway URL cannot be a base: {}",
                    self.pushgateway_url
                ))
            })?
            .pop_if_empty()
            .extend(["metrics", "job", PUSH_JOB, "instance", service]);
        Ok(url)
    }

    pub async fn inject_high_error_rate(&self, service: &str, duration_minutes: u64) -> Result<InjectionReport> {
        info!("💥 Injecting high error rate for {} (duration: {}min)", service, duration_minutes);
        let payload = payloads::error_rate_payload(service);
        let report = self.push_for(service, &payload, duration_minutes).await?;
        info!("✅ Injected {} metric batches", report.pushes_accepted);
        Ok(report)
    }

    pub async fn inject_high_latency(
        &self,
        service: &str,
        latency_ms: u64,
        duration_minutes: u64,
    ) -> Result<InjectionReport> {
        info!(
            "🐢 Injecting high latency for {} ({}ms, duration: {}min)",
            service, latency_ms, duration_minutes
        );
        let payload = payloads::latency_payload(service, latency_ms);
        let report = self.push_for(service, &payload, duration_minutes).await?;
        info!("✅ Latency metrics injection complete");
        Ok(report)
    }

    /// `resource_type` is `memory` or `cpu`; anything else fails before any request.
    pub async fn inject_resource_exhaustion(
        &self,
        service: &str,
        resource_type: &str,
        usage_percent: u32,
        duration_minutes: u64,
    ) -> Result<InjectionReport> {
        let resource: ResourceType = match resource_type.parse() {
            Ok(resource) => resource,
            Err(e) => {
                error!("❌ {}", e);
                return Err(e);
            }
        };
        info!(
            "🔥 Injecting {} exhaustion for {} ({}%, duration: {}min)",
            resource, service, usage_percent, duration_minutes
        );
        let payload = payloads::resource_payload(service, resource, usage_percent);
        let report = self.push_for(service, &payload, duration_minutes).await?;
        info!("✅ Resource exhaustion metrics injection complete");
        Ok(report)
    }

    pub async fn clear_injected_metrics(&self, service: &str) -> Result<()> {
        info!("🧹 Clearing injected metrics for {}...", service);
        let url = self.push_url(service)?;

        let response = match self.client.delete(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ Error clearing metrics: {}", e);
                return Err(AlertTestError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if is_accepted(status) {
            info!("✅ Metrics cleared");
            Ok(())
        } else {
            error!("❌ Failed to clear metrics: {}", status.as_u16());
            Err(AlertTestError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// Re-sends `payload` every push interval until `duration_minutes` have
    /// passed on the injected clock.
    async fn push_for(
        &self,
        service: &str,
        payload: &[MetricFamily],
        duration_minutes: u64,
    ) -> Result<InjectionReport> {
        let url = self.push_url(service)?;
        let body = exposition::encode_text(payload)?;
        let duration = Duration::from_secs(duration_minutes.saturating_mul(60));
        let start = self.clock.now();
        let deadline = start.checked_add(duration).ok_or_else(|| {
            error!("❌ Duration of {} minutes is out of range", duration_minutes);
            AlertTestError::InvalidConfig(format!("Duration of {duration_minutes} minutes is out of range"))
        })?;
        let mut report = InjectionReport::default();

        while self.clock.now() < deadline {
            report.pushes_attempted += 1;
            let response = self
                .client
                .post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body.clone())
                .send()
                .await;

            match response {
                Ok(response) if is_accepted(response.status()) => {
                    report.pushes_accepted += 1;
                    info!("✓ Metrics injected ({})", report.pushes_accepted);
                }
                Ok(response) => {
                    report.pushes_rejected += 1;
                    warn!(
                        "❌ Push {} rejected with status {} ({} rejected so far)",
                        report.pushes_attempted,
                        response.status().as_u16(),
                        report.pushes_rejected
                    );
                    if self.failure_policy.should_abort(report.pushes_rejected) {
                        error!("❌ Aborting injection: failure policy '{}' reached", self.failure_policy);
                        report.aborted_by_policy = true;
                        break;
                    }
                }
                Err(e) => {
                    error!("❌ Error injecting metrics: {}", e);
                    return Err(AlertTestError::Transport(e.to_string()));
                }
            }

            self.clock.sleep(self.push_interval).await;
        }

        report.elapsed = self.clock.elapsed_since(start);
        info!(
            "📊 Pushes: {} attempted, {} accepted, {} rejected",
            report.pushes_attempted, report.pushes_accepted, report.pushes_rejected
        );
        Ok(report)
    }
}
