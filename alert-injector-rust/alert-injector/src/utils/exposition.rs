//! Fixed-value metric families, encoded in the Prometheus text format.
//!
//! Families are built straight from the protobuf model, never registered.

use prometheus::proto::{Bucket, Counter, Gauge, Histogram, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

use crate::domain::error::{AlertTestError, Result};

pub fn label_pairs(labels: &[(&str, &str)]) -> Vec<LabelPair> {
    labels
        .iter()
        .map(|(name, value)| {
            let mut pair = LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value.to_string());
            pair
        })
        .collect()
}

pub fn family(name: &str, help: &str, metric_type: MetricType, metrics: Vec<Metric>) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(name.to_string());
    family.set_help(help.to_string());
    family.set_type(metric_type);
    family.metric = metrics;
    family
}

pub fn counter(labels: &[(&str, &str)], value: f64) -> Metric {
    let mut counter = Counter::default();
    counter.set_value(value);
    let mut metric = Metric::default();
    metric.label = label_pairs(labels);
    metric.counter = Some(counter).into();
    metric
}

pub fn gauge(labels: &[(&str, &str)], value: f64) -> Metric {
    let mut gauge = Gauge::default();
    gauge.set_value(value);
    let mut metric = Metric::default();
    metric.label = label_pairs(labels);
    metric.gauge = Some(gauge).into();
    metric
}

/// One histogram series from cumulative `(upper_bound, count)` buckets.
///
/// Finite bounds only: the encoder writes the `le="+Inf"` bucket itself
/// from `count`.
pub fn histogram(labels: &[(&str, &str)], buckets: &[(f64, u64)], sum: f64, count: u64) -> Metric {
    let mut histogram = Histogram::default();
    histogram.set_sample_sum(sum);
    histogram.set_sample_count(count);
    histogram.bucket = buckets
        .iter()
        .filter(|(upper_bound, _)| upper_bound.is_finite())
        .map(|(upper_bound, cumulative)| {
            let mut bucket = Bucket::default();
            bucket.set_upper_bound(*upper_bound);
            bucket.set_cumulative_count(*cumulative);
            bucket
        })
        .collect();
    let mut metric = Metric::default();
    metric.label = label_pairs(labels);
    metric.histogram = Some(histogram).into();
    metric
}

/// Text exposition body, as accepted by a push gateway.
pub fn encode_text(families: &[MetricFamily]) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(families, &mut buffer)
        .map_err(|e| AlertTestError::Generic(format!("Failed to encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| AlertTestError::Generic(format!("Encoded metrics are not UTF-8: {e}")))
}
