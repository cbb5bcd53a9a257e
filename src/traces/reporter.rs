//! Span assembly and delivery to the trace agent.
//!
//! Delivery is strictly best-effort: serialization or network failures are
//! logged and counted, never surfaced to the request path. The agent's
//! response body is drained regardless of status so the connection returns
//! to the pool.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Uri};
use serde::Serialize;
use tracing::{error, warn};

use crate::controller::metrics;
use crate::http::client::{create_client, HyperClient};

use super::ident::TraceIdentity;

/// Path of the agent trace-intake endpoint.
pub const TRACES_PATH: &str = "/v0.4/traces";

const CONTENT_TYPE_JSON: &str = "application/json";

// Error types
#[derive(Debug, thiserror::Error)]
pub enum TracesError {
    #[error("agent url is empty")]
    AgentUrlEmpty,
    #[error("agent url is invalid: {0}")]
    AgentUrlInvalid(String),
    #[error("service name is empty")]
    ServiceNameEmpty,
}

/// Wire-level span record submitted to the agent.
///
/// The agent ingests a list of traces, each a list of spans; a single
/// request produces one span wrapped in one trace.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub trace_id: u64,
    pub span_id: u64,
    pub parent_id: u64,
    pub name: String,
    pub resource: String,
    pub service: String,
    pub start: i64,
    pub duration: i64,
    pub meta: HashMap<String, String>,
}

/// Builds span records for completed requests and POSTs them to the agent.
#[derive(Debug)]
pub struct SpanReporter {
    service_name: String,
    agent_url: String,
    client: HyperClient,
}

impl SpanReporter {
    /// Creates a reporter for the given service, validating the agent URL.
    pub fn new(service_name: &str, agent_url: &str) -> Result<Self, TracesError> {
        if service_name.is_empty() {
            return Err(TracesError::ServiceNameEmpty);
        }
        if agent_url.is_empty() {
            return Err(TracesError::AgentUrlEmpty);
        }
        url::Url::parse(agent_url).map_err(|e| TracesError::AgentUrlInvalid(e.to_string()))?;

        Ok(Self {
            service_name: service_name.to_string(),
            agent_url: agent_url.trim_end_matches('/').to_string(),
            client: create_client(),
        })
    }

    /// Assembles the wire record for one request.
    ///
    /// The span is always a root from the agent's perspective (parent 0);
    /// its start timestamp is back-computed from the measured duration.
    pub fn build_record(
        &self,
        identity: TraceIdentity,
        duration: Duration,
        meta: HashMap<String, String>,
    ) -> SpanRecord {
        let duration_ns = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        let now_ns = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

        SpanRecord {
            trace_id: identity.trace_id,
            span_id: identity.span_id,
            parent_id: 0,
            name: format!("{}-operation", self.service_name),
            resource: format!("{}-operation", self.service_name),
            service: format!("{}-service", self.service_name),
            start: now_ns - duration_ns,
            duration: duration_ns,
            meta,
        }
    }

    /// Serializes the one-span trace envelope for the agent.
    pub fn encode_envelope(record: &SpanRecord) -> Result<Vec<u8>, serde_json::Error> {
        let envelope = vec![vec![record]];
        serde_json::to_vec(&envelope)
    }

    /// Delivers one span to the agent.
    pub async fn report(
        &self,
        identity: TraceIdentity,
        duration: Duration,
        meta: HashMap<String, String>,
    ) {
        let record = self.build_record(identity, duration, meta);

        let payload = match Self::encode_envelope(&record) {
            Ok(payload) => payload,
            Err(e) => {
                metrics::inc_span_export_failures(1);
                error!(
                    component = "traces",
                    scope = "reporter",
                    event = "encode_failed",
                    error = %e,
                    "failed to serialize span envelope"
                );
                return;
            }
        };

        let uri: Uri = match format!("{}{}", self.agent_url, TRACES_PATH).parse() {
            Ok(uri) => uri,
            Err(e) => {
                metrics::inc_span_export_failures(1);
                error!(
                    component = "traces",
                    scope = "reporter",
                    event = "bad_agent_uri",
                    error = %e,
                    "agent trace endpoint is not a valid uri"
                );
                return;
            }
        };

        let body: BoxBody<Bytes, hyper::Error> = Full::new(Bytes::from(payload))
            .map_err(|never: std::convert::Infallible| match never {})
            .boxed();

        let req = match Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body)
        {
            Ok(req) => req,
            Err(e) => {
                metrics::inc_span_export_failures(1);
                error!(
                    component = "traces",
                    scope = "reporter",
                    event = "build_request_failed",
                    error = %e,
                    "failed to build agent request"
                );
                return;
            }
        };

        match self.client.request(req).await {
            Ok(response) => {
                let status = response.status();

                // Drain the body so the connection returns to the pool.
                let _ = response.into_body().collect().await;

                if !status.is_success() {
                    metrics::inc_span_export_failures(1);
                    warn!(
                        component = "traces",
                        scope = "reporter",
                        event = "agent_rejected",
                        status = %status,
                        "agent refused span payload"
                    );
                    return;
                }

                metrics::inc_spans_exported(1);
            }
            Err(e) => {
                metrics::inc_span_export_failures(1);
                error!(
                    component = "traces",
                    scope = "reporter",
                    event = "send_failed",
                    error = %e,
                    "failed to deliver span to agent"
                );
            }
        }
    }

    /// Service label the reporter stamps on spans.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Base URL of the agent this reporter posts to.
    pub fn agent_url(&self) -> &str {
        &self.agent_url
    }
}
