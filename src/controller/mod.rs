// HTTP API controllers for the proxy endpoints.

pub mod controller;
pub mod metrics;
pub mod proxy;

// Re-export controller types for convenience
pub use metrics::PrometheusMetricsController;
pub use proxy::ProxyController;
