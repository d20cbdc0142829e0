//! Fixed-shape metric batches for each simulated failure condition.

use std::fmt;
use std::str::FromStr;

use prometheus::proto::{MetricFamily, MetricType};

use crate::domain::error::AlertTestError;
use crate::utils::exposition::{counter, family, gauge, histogram};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const CONTAINER_MEMORY_USAGE_BYTES: &str = "container_memory_usage_bytes";
pub const CONTAINER_MEMORY_LIMIT_BYTES: &str = "container_spec_memory_limit_bytes";
pub const CONTAINER_CPU_USAGE_SECONDS: &str = "container_cpu_usage_seconds_total";
pub const CONTAINER_CPU_QUOTA: &str = "container_spec_cpu_quota";

/// Observations simulated by the latency histogram.
pub const LATENCY_OBSERVATIONS: u64 = 100;

const MEMORY_BYTES_PER_PERCENT: f64 = 10_000_000.0;
const CPU_USAGE_PER_PERCENT: f64 = 1000.0;
const CPU_QUOTA: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Memory,
    Cpu,
}

impl FromStr for ResourceType {
    type Err = AlertTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(ResourceType::Memory),
            "cpu" => Ok(ResourceType::Cpu),
            other => Err(AlertTestError::InvalidConfig(format!(
                "Unknown resource type: {other} (expected memory or cpu)"
            ))),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Memory => write!(f, "memory"),
            ResourceType::Cpu => write!(f, "cpu"),
        }
    }
}

/// 60% of requests failing plus a slow-ish latency histogram.
pub fn error_rate_payload(service: &str) -> Vec<MetricFamily> {
    vec![
        family(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP requests",
            MetricType::COUNTER,
            vec![
                counter(&[("service", service), ("status", "200")], 100.0),
                counter(&[("service", service), ("status", "500")], 150.0),
            ],
        ),
        family(
            HTTP_REQUEST_DURATION_SECONDS,
            "HTTP request duration",
            MetricType::HISTOGRAM,
            vec![histogram(
                &[("service", service)],
                &[(0.1, 50), (0.5, 100), (1.0, 200)],
                125.5,
                250,
            )],
        ),
    ]
}

/// `sum` is `latency_ms / 1000 * 100`: 100 observations at the given average.
pub fn latency_payload(service: &str, latency_ms: u64) -> Vec<MetricFamily> {
    let sum = latency_ms as f64 / 1000.0 * LATENCY_OBSERVATIONS as f64;
    vec![family(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration",
        MetricType::HISTOGRAM,
        vec![histogram(
            &[("service", service)],
            &[(0.1, 10), (0.5, 20), (1.0, 30), (2.0, 40), (5.0, 80)],
            sum,
            LATENCY_OBSERVATIONS,
        )],
    )]
}

pub fn resource_payload(service: &str, resource: ResourceType, usage_percent: u32) -> Vec<MetricFamily> {
    let labels = [("container", service)];
    let usage = usage_percent as f64;
    match resource {
        ResourceType::Memory => vec![
            family(
                CONTAINER_MEMORY_USAGE_BYTES,
                "Container memory usage",
                MetricType::GAUGE,
                vec![gauge(&labels, usage * MEMORY_BYTES_PER_PERCENT)],
            ),
            family(
                CONTAINER_MEMORY_LIMIT_BYTES,
                "Container memory limit",
                MetricType::GAUGE,
                vec![gauge(&labels, 100.0 * MEMORY_BYTES_PER_PERCENT)],
            ),
        ],
        ResourceType::Cpu => vec![
            family(
                CONTAINER_CPU_USAGE_SECONDS,
                "Container CPU usage",
                MetricType::COUNTER,
                vec![counter(&labels, usage * CPU_USAGE_PER_PERCENT)],
            ),
            family(
                CONTAINER_CPU_QUOTA,
                "Container CPU quota",
                MetricType::GAUGE,
                vec![gauge(&labels, CPU_QUOTA)],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::exposition::encode_text;

    fn sample_value(payload: &str, series: &str) -> f64 {
        payload
            .lines()
            .find(|line| line.starts_with(series))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| panic!("series {series} not found in:\n{payload}"))
    }

    #[test]
    fn test_error_rate_payload_shape() {
        let payload = encode_text(&error_rate_payload("checkout")).unwrap();
        assert!(payload.contains("# TYPE http_requests_total counter\n"));
        assert!(payload.contains("# TYPE http_request_duration_seconds histogram\n"));
        assert_eq!(
            sample_value(&payload, "http_requests_total{service=\"checkout\",status=\"200\"}"),
            100.0
        );
        assert_eq!(
            sample_value(&payload, "http_requests_total{service=\"checkout\",status=\"500\"}"),
            150.0
        );
        assert_eq!(
            sample_value(&payload, "http_request_duration_seconds_bucket{service=\"checkout\",le=\"1\"}"),
            200.0
        );
        assert_eq!(sample_value(&payload, "http_request_duration_seconds_sum"), 125.5);
        assert_eq!(sample_value(&payload, "http_request_duration_seconds_count"), 250.0);
    }

    #[test]
    fn test_latency_sum_scales_with_latency() {
        let payload = encode_text(&latency_payload("checkout", 2000)).unwrap();
        assert_eq!(sample_value(&payload, "http_request_duration_seconds_sum"), 200.0);
        assert_eq!(sample_value(&payload, "http_request_duration_seconds_count"), 100.0);
        assert!(payload.contains("le=\"5\"} 80\n"));
        assert!(payload.contains("le=\"+Inf\"} 100\n"));

        let payload = encode_text(&latency_payload("checkout", 350)).unwrap();
        assert_eq!(sample_value(&payload, "http_request_duration_seconds_sum"), 35.0);
    }

    #[test]
    fn test_memory_payload() {
        let payload = encode_text(&resource_payload("db", ResourceType::Memory, 95)).unwrap();
        assert_eq!(sample_value(&payload, "container_memory_usage_bytes{container=\"db\"}"), 950_000_000.0);
        assert_eq!(sample_value(&payload, "container_spec_memory_limit_bytes"), 1_000_000_000.0);
        assert!(payload.contains("# TYPE container_memory_usage_bytes gauge\n"));
    }

    #[test]
    fn test_cpu_payload() {
        let payload = encode_text(&resource_payload("db", ResourceType::Cpu, 90)).unwrap();
        assert!(payload.contains("# TYPE container_cpu_usage_seconds_total counter\n"));
        assert_eq!(sample_value(&payload, "container_cpu_usage_seconds_total"), 90_000.0);
        assert_eq!(sample_value(&payload, "container_spec_cpu_quota"), 100_000.0);
    }

    #[test]
    fn test_resource_type_parsing() {
        assert_eq!("memory".parse::<ResourceType>(), Ok(ResourceType::Memory));
        assert_eq!("cpu".parse::<ResourceType>(), Ok(ResourceType::Cpu));
        assert!(matches!(
            "disk".parse::<ResourceType>(),
            Err(AlertTestError::InvalidConfig(_))
        ));
    }
}
