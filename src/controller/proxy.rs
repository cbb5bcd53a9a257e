// Proxy controller: the downstream handler of the pipeline, forwarding
// every request to the upstream backend.

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use tracing::error;

use crate::controller::controller::Controller;
use crate::controller::metrics;
use crate::traces::{Scope, TimingScope};
use crate::upstream::Upstream;

/// Largest request body the forwarder will buffer.
const MAX_BODY_BYTES: usize = 16 << 20;

/// Forwards requests to the upstream backend.
#[derive(Clone)]
pub struct ProxyController {
    upstream: Arc<dyn Upstream>,
}

impl ProxyController {
    /// Creates a new proxy controller.
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Main HTTP handler for proxied requests.
    async fn index(State(controller): State<Arc<Self>>, request: axum::extract::Request) -> Response {
        metrics::inc_requests_proxied(1);

        let method = request.method().as_str().to_string();
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        let mut request_headers = Vec::new();
        for (name, value) in request.headers() {
            if let Ok(value_str) = value.to_str() {
                request_headers.push((name.as_str().to_string(), value_str.to_string()));
            }
        }

        // The timing scope installed by the tracing middleware, when present.
        let timing_scope = request.extensions().get::<TimingScope>().cloned();
        let scope = timing_scope.as_ref().map(|s| s as &dyn Scope);

        let body_bytes = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    component = "controller",
                    scope = "proxy",
                    event = "read_body_failed",
                    error = %e,
                    "failed to buffer request body"
                );
                return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
            }
        };
        let body = if body_bytes.is_empty() {
            None
        } else {
            Some(&body_bytes[..])
        };

        match controller
            .upstream
            .proxy_request(&method, &path_and_query, &request_headers, body, scope)
            .await
        {
            Ok(upstream_response) => {
                let mut builder = Response::builder().status(upstream_response.status);
                for (name, value) in &upstream_response.headers {
                    if !crate::upstream::proxy::is_hop_by_hop(name) {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                }

                match builder.body(Body::from(upstream_response.body)) {
                    Ok(response) => response,
                    Err(e) => {
                        error!(
                            component = "controller",
                            scope = "proxy",
                            event = "build_response_failed",
                            error = %e,
                            "failed to rebuild upstream response"
                        );
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
                    }
                }
            }
            Err(e) => {
                error!(
                    component = "controller",
                    scope = "proxy",
                    event = "upstream_failed",
                    error = %e,
                    "fetch upstream error while proxying"
                );
                (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
            }
        }
    }
}

impl Controller for ProxyController {
    fn add_route(&self, router: Router) -> Router {
        let controller = Arc::new(self.clone());
        let root = {
            let controller = controller.clone();
            move |request: axum::extract::Request| {
                let controller = controller.clone();
                async move { Self::index(State(controller), request).await }
            }
        };
        let wildcard = {
            let controller = controller.clone();
            move |request: axum::extract::Request| {
                let controller = controller.clone();
                async move { Self::index(State(controller), request).await }
            }
        };

        router
            .route("/", any(root))
            .route("/*path", any(wildcard))
    }
}
