//! Prometheus metrics: install a global recorder at startup, describe
//! every metric name up front, and expose a `/metrics` handler for the
//! counters this request pipeline actually emits.

use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder");

        metrics::describe_counter!(
            "push_requests_total",
            "Total number of push notification requests, labeled by variant and outcome"
        );
        metrics::describe_histogram!(
            "push_request_duration_seconds",
            "Push notification request duration in seconds"
        );
        metrics::describe_counter!(
            "push_rate_limited_total",
            "Total number of requests rejected for exceeding the daily quota"
        );
        metrics::describe_counter!(
            "push_rate_limit_notifications_sent_total",
            "Total number of one-shot rate-limit notifications sent"
        );
        metrics::describe_counter!(
            "push_gateway_errors_total",
            "Total number of gateway send errors, labeled by errorType"
        );

        Self { handle }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler(handle: axum::extract::State<PrometheusHandle>) -> impl IntoResponse {
    let metrics = handle.render();
    (StatusCode::OK, metrics)
}

pub fn record_request(variant: &'static str, outcome: &'static str) {
    metrics::counter!("push_requests_total", "variant" => variant, "outcome" => outcome, 1);
}

pub fn record_rate_limited() {
    metrics::counter!("push_rate_limited_total", 1);
}

pub fn record_rate_limit_notification_sent() {
    metrics::counter!("push_rate_limit_notifications_sent_total", 1);
}

pub fn record_gateway_error(error_type: &'static str) {
    metrics::counter!("push_gateway_errors_total", "errorType" => error_type, 1);
}

pub fn record_gateway_send_duration(variant: &'static str, seconds: f64) {
    metrics::histogram!("push_request_duration_seconds", "variant" => variant, seconds);
}
