//! Hyper-based upstream backend implementation.

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{Method, Request, Uri};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, warn};

use super::proxy;
use super::upstream::{Response, Upstream};
use crate::config::Backend;
use crate::http::client::{create_client, HyperClient};
use crate::traces::Scope;

/// Per-request timeout when the config does not set one.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend implementation for upstream requests.
pub struct BackendImpl {
    client: HyperClient,
    scheme: String,
    host: String,
    timeout: Duration,
}

impl BackendImpl {
    /// Creates a backend from its config section.
    pub fn new(cfg: Option<Backend>) -> Result<Self> {
        let cfg = cfg.context("upstream backend config is required")?;
        let host = cfg
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .context("upstream backend host is required")?;

        Ok(Self {
            client: create_client(),
            scheme: cfg.scheme.clone().unwrap_or_else(|| "http".to_string()),
            host,
            timeout: cfg.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    fn build_uri(&self, path_and_query: &str) -> Result<Uri> {
        format!("{}://{}{}", self.scheme, self.host, path_and_query)
            .parse()
            .context("build upstream uri")
    }

    /// Effective timeout for one request: the configured timeout, tightened
    /// by the scope deadline when one is set.
    fn effective_timeout(&self, scope: Option<&dyn Scope>) -> Duration {
        let mut limit = self.timeout;
        if let Some(deadline) = scope.and_then(|s| s.deadline()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < limit {
                limit = remaining;
            }
        }
        limit
    }
}

#[async_trait::async_trait]
impl Upstream for BackendImpl {
    async fn proxy_request(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
        scope: Option<&dyn Scope>,
    ) -> Result<Response> {
        let uri = self.build_uri(path_and_query)?;
        let uri_str = uri.to_string();
        let method = Method::from_bytes(method.as_bytes()).context("parse request method")?;

        let mut builder = Request::builder().method(method).uri(uri);

        // Set all headers except Host (Host is set after build() so the
        // forwarded value overrides the URI-derived one).
        for (name, value) in proxy::filter_hop_by_hop_headers(headers) {
            if !name.eq_ignore_ascii_case("host") {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let req_body: BoxBody<Bytes, hyper::Error> = match body {
            Some(bytes) => Full::new(Bytes::copy_from_slice(bytes))
                .map_err(|never: std::convert::Infallible| match never {})
                .boxed(),
            None => Empty::<Bytes>::new()
                .map_err(|never: std::convert::Infallible| match never {})
                .boxed(),
        };

        let mut req = builder.body(req_body)?;

        if let Some(host) = proxy::forwarded_host_value(headers) {
            if let Ok(host_value) = hyper::header::HeaderValue::from_str(&host) {
                req.headers_mut().remove(hyper::header::HOST);
                req.headers_mut().insert(hyper::header::HOST, host_value);
            }
        }

        let timeout_duration = self.effective_timeout(scope);
        let call = timeout(timeout_duration, self.client.request(req));

        let result = match scope {
            Some(s) => {
                let token = s.cancellation().clone();
                tokio::select! {
                    _ = token.cancelled() => {
                        warn!(
                            uri = %uri_str,
                            "request scope cancelled while proxying"
                        );
                        return Err(anyhow!("request cancelled (URI: {})", uri_str))
                            .context("Request cancelled");
                    }
                    result = call => result,
                }
            }
            None => call.await,
        };

        let response = match result {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!(
                    uri = %uri_str,
                    error = %e,
                    "Hyper client request failed"
                );
                return Err(anyhow!("Hyper client error: {} (URI: {})", e, uri_str))
                    .context("Request failed");
            }
            Err(_) => {
                warn!(
                    uri = %uri_str,
                    timeout = ?timeout_duration,
                    "Request timed out"
                );
                return Err(anyhow!(
                    "Request timed out after {:?} (URI: {})",
                    timeout_duration,
                    uri_str
                ))
                .context("Request timeout");
            }
        };

        let status = response.status().as_u16();

        let mut response_headers = Vec::new();
        for (name, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                response_headers.push((name.as_str().to_string(), value_str.to_string()));
            }
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .context("Failed to read response body")?
            .to_bytes();

        Ok(Response::new(status, response_headers, body_bytes.to_vec()))
    }
}
