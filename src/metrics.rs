//! Prometheus metrics for prediction traffic and latency.
//!
//! This module provides metrics for:
//! - Predictions served, by label
//! - Prediction failures, by error kind
//! - Model load and inference latency
//! - HTTP request latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Model load latency metric name.
pub const METRIC_MODEL_LOAD_LATENCY: &str = "model_load_latency_ms";
/// Inference latency metric name.
pub const METRIC_INFERENCE_LATENCY: &str = "inference_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Predictions served counter metric name.
pub const METRIC_PREDICTIONS: &str = "predictions_total";
/// Prediction failures counter metric name.
pub const METRIC_PREDICTION_ERRORS: &str = "prediction_errors_total";

/// Install the Prometheus recorder and register metric descriptions.
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| e.to_string())?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_MODEL_LOAD_LATENCY,
        "Model artifact read and parse latency in milliseconds"
    );
    describe_histogram!(
        METRIC_INFERENCE_LATENCY,
        "Single-row inference latency in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_PREDICTIONS, "Total number of predictions served");
    describe_counter!(
        METRIC_PREDICTION_ERRORS,
        "Total number of prediction requests that failed"
    );

    debug!("Metrics initialized");
}

/// Record model load latency.
pub fn record_model_load_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_MODEL_LOAD_LATENCY).record(latency_ms);
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment predictions counter.
pub fn inc_predictions(label: &str) {
    counter!(METRIC_PREDICTIONS, "label" => label.to_string()).increment(1);
}

/// Increment prediction failures counter.
pub fn inc_prediction_errors(kind: &'static str) {
    counter!(METRIC_PREDICTION_ERRORS, "kind" => kind).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for inference.
pub fn timer_inference() -> LatencyTimer {
    LatencyTimer::new(METRIC_INFERENCE_LATENCY)
}
