//! Metrics controller.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::sync::OnceLock;

use crate::controller::controller::Controller;

pub const PROMETHEUS_METRICS_PATH: &str = "/metrics";

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Initializes the Prometheus metrics exporter.
///
/// Must be called BEFORE the tokio runtime starts: the recorder install
/// path may spin up its own runtime internals and cannot run inside one.
pub fn init_prometheus_exporter() -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Prometheus handle already initialized"))?;

    Ok(())
}

/// Counts one request handed to the upstream forwarder.
pub fn inc_requests_proxied(n: u64) {
    metrics::counter!("edgetrace_requests_proxied_total").increment(n);
}

/// Counts spans accepted by the trace agent.
pub fn inc_spans_exported(n: u64) {
    metrics::counter!("edgetrace_spans_exported_total").increment(n);
}

/// Counts spans that failed to serialize or deliver.
pub fn inc_span_export_failures(n: u64) {
    metrics::counter!("edgetrace_span_export_failures_total").increment(n);
}

/// PrometheusMetricsController handles the Prometheus metrics endpoint.
pub struct PrometheusMetricsController;

impl PrometheusMetricsController {
    /// Creates a new Prometheus metrics controller.
    pub fn new() -> Self {
        Self
    }

    /// Renders the metrics snapshot.
    async fn get_metrics() -> impl IntoResponse {
        let body = PROMETHEUS_HANDLE
            .get()
            .map(|handle| handle.render())
            .unwrap_or_default();

        (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            body,
        )
    }
}

impl Default for PrometheusMetricsController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for PrometheusMetricsController {
    fn add_route(&self, router: Router) -> Router {
        router.route(PROMETHEUS_METRICS_PATH, get(Self::get_metrics))
    }
}
