//! In-process stand-in for a push gateway plus alert manager.
//!
//! Accepts pushes on `/metrics/job/{job}/instance/{instance}` and, once
//! `fire_after` has passed since the first push for an instance, reports an
//! active alert for it on `/api/v2/alerts`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use tracing::info;

use crate::domain::alert::{Alert, AlertStatus, ACTIVE_STATE, ALERT_NAME_LABEL};
use crate::infrastructure::clock::Clock;

#[derive(Debug, Clone)]
pub struct FakePipelineConfig {
    pub alert_name: String,
    pub fire_after: Duration,
    pub severity: String,
    pub annotations: HashMap<String, String>,
}

impl Default for FakePipelineConfig {
    fn default() -> Self {
        let mut annotations = HashMap::new();
        annotations.insert("summary".to_string(), "Synthetic alert from fake pipeline".to_string());
        Self {
            alert_name: "HighErrorRate".to_string(),
            fire_after: Duration::from_secs(20),
            severity: "critical".to_string(),
            annotations,
        }
    }
}

#[derive(Debug, Clone)]
struct PushRecord {
    job: String,
    first_push: Instant,
    pushes: u32,
    last_body: String,
}

pub struct FakePipeline {
    config: FakePipelineConfig,
    clock: Arc<dyn Clock>,
    instances: Mutex<HashMap<String, PushRecord>>,
}

impl FakePipeline {
    pub fn new(config: FakePipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            instances: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PushRecord>> {
        self.instances.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_push(&self, job: &str, instance: &str, body: String) -> u32 {
        let now = self.clock.now();
        let mut instances = self.lock();
        let record = instances.entry(instance.to_string()).or_insert_with(|| PushRecord {
            job: job.to_string(),
            first_push: now,
            pushes: 0,
            last_body: String::new(),
        });
        record.pushes += 1;
        record.last_body = body;
        record.pushes
    }

    pub fn clear(&self, instance: &str) -> bool {
        self.lock().remove(instance).is_some()
    }

    pub fn push_count(&self, instance: &str) -> u32 {
        self.lock().get(instance).map(|r| r.pushes).unwrap_or(0)
    }

    pub fn last_payload(&self, instance: &str) -> Option<String> {
        self.lock().get(instance).map(|r| r.last_body.clone())
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        let now = self.clock.now();
        let instances = self.lock();
        let mut alerts: Vec<Alert> = instances
            .iter()
            .filter(|(_, record)| now.saturating_duration_since(record.first_push) >= self.config.fire_after)
            .map(|(instance, record)| {
                let mut labels = HashMap::new();
                labels.insert(ALERT_NAME_LABEL.to_string(), self.config.alert_name.clone());
                labels.insert("service".to_string(), instance.clone());
                labels.insert("job".to_string(), record.job.clone());
                labels.insert("severity".to_string(), self.config.severity.clone());
                Alert {
                    labels,
                    annotations: self.config.annotations.clone(),
                    status: AlertStatus {
                        state: ACTIVE_STATE.to_string(),
                        ..AlertStatus::default()
                    },
                    fingerprint: Some(format!("fake-{instance}")),
                    starts_at: Some(Utc::now()),
                    ends_at: None,
                }
            })
            .collect();
        alerts.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        alerts
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Fake pipeline is running"
    }))
}

async fn push_metrics(
    pipeline: web::Data<FakePipeline>,
    path: web::Path<(String, String)>,
    body: String,
) -> impl Responder {
    let (job, instance) = path.into_inner();
    let pushes = pipeline.record_push(&job, &instance, body);
    info!("📥 Push {} for job={} instance={}", pushes, job, instance);
    HttpResponse::Accepted().finish()
}

async fn delete_metrics(
    pipeline: web::Data<FakePipeline>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (job, instance) = path.into_inner();
    let existed = pipeline.clear(&instance);
    info!("🧹 Delete job={} instance={} (existed: {})", job, instance, existed);
    HttpResponse::Accepted().finish()
}

async fn list_alerts(pipeline: web::Data<FakePipeline>) -> impl Responder {
    HttpResponse::Ok().json(pipeline.active_alerts())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::resource("/metrics/job/{job}/instance/{instance}")
                .route(web::post().to(push_metrics))
                .route(web::put().to(push_metrics))
                .route(web::delete().to(delete_metrics)),
        )
        .route("/api/v2/alerts", web::get().to(list_alerts));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use crate::infrastructure::clock::ManualClock;

    fn pipeline(clock: Arc<ManualClock>) -> web::Data<FakePipeline> {
        web::Data::new(FakePipeline::new(FakePipelineConfig::default(), clock))
    }

    #[actix_web::test]
    async fn test_alert_fires_after_delay() {
        let clock = Arc::new(ManualClock::new());
        let data = pipeline(clock.clone());
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/metrics/job/alert_test/instance/test-service")
            .set_payload("# TYPE up gauge\nup 1\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(data.push_count("test-service"), 1);
        assert_eq!(data.last_payload("test-service").as_deref(), Some("# TYPE up gauge\nup 1\n"));

        let req = test::TestRequest::get().uri("/api/v2/alerts").to_request();
        let alerts: Vec<Alert> = test::call_and_read_body_json(&app, req).await;
        assert!(alerts.is_empty());

        clock.advance(Duration::from_secs(20));
        let req = test::TestRequest::get().uri("/api/v2/alerts").to_request();
        let alerts: Vec<Alert> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].is_active());
        assert!(alerts[0].is_named("HighErrorRate"));
        assert_eq!(alerts[0].labels["service"], "test-service");
        assert!(alerts[0].annotations.contains_key("summary"));
    }

    #[actix_web::test]
    async fn test_delete_clears_instance() {
        let clock = Arc::new(ManualClock::new());
        let data = pipeline(clock.clone());
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        data.record_push("alert_test", "checkout", String::new());
        clock.advance(Duration::from_secs(60));
        assert_eq!(data.active_alerts().len(), 1);

        let req = test::TestRequest::delete()
            .uri("/metrics/job/alert_test/instance/checkout")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(data.push_count("checkout"), 0);
        assert!(data.active_alerts().is_empty());
    }

    #[actix_web::test]
    async fn test_health() {
        let clock = Arc::new(ManualClock::new());
        let app = test::init_service(App::new().app_data(pipeline(clock)).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }
}
