//! Request-tracing middleware.
//!
//! Stamps every proxied request with a trace identity, propagates it to
//! the downstream handler via headers, measures handling latency through a
//! timing scope and ships exactly one span per completed request to the
//! trace agent. Tracing failures never affect the proxied request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

use crate::config::{Tracing, DEFAULT_AGENT_URL, DEFAULT_SERVICE_NAME};
use crate::traces::reporter::SpanReporter;
use crate::traces::{self, attributes, propagation, RequestScope, Scope, TimingScope, TracesError};

/// TracingMiddleware traces proxied requests and reports spans.
#[derive(Clone)]
pub struct TracingMiddleware {
    global_tags: HashMap<String, String>,
    reporter: Arc<SpanReporter>,
}

impl TracingMiddleware {
    /// Creates the middleware from its config section.
    ///
    /// Missing fields fall back to the stock defaults; an invalid agent
    /// URL or empty service name is a construction error.
    pub fn new(cfg: Option<&Tracing>) -> Result<Self, TracesError> {
        let service_name = cfg
            .and_then(|c| c.service_name.clone())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let agent_url = cfg
            .and_then(|c| c.agent_url.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string());
        let global_tags = cfg.map(|c| c.global_tags.clone()).unwrap_or_default();

        let reporter = Arc::new(SpanReporter::new(&service_name, &agent_url)?);

        info!(
            component = "middleware",
            scope = "tracing",
            event = "initialized",
            service_name = %service_name,
            agent_url = %agent_url,
            "tracing middleware ready"
        );

        Ok(Self {
            global_tags,
            reporter,
        })
    }

    /// Middleware function handling one request.
    pub async fn middleware(&self, mut request: Request, next: Next) -> Response {
        // Wrap the request scope for timing. An outer layer may have
        // installed a parent scope already; otherwise start a fresh one.
        let parent = request
            .extensions()
            .get::<Arc<dyn Scope>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(RequestScope::new()) as Arc<dyn Scope>);
        let scope = TimingScope::new(parent);
        request.extensions_mut().insert(scope.clone());

        // Assign the trace identity and propagate it downstream.
        let identity = traces::generate();
        propagation::inject(request.headers_mut(), &identity);

        // The request is consumed by the next handler; sample the
        // attribute sources now.
        let view = attributes::RequestView::capture(&request);

        let response = next.run(request).await;

        // A foreign timing scope in the response means an incompatible
        // wrapper claimed the request scope. Skip measurement and
        // reporting entirely; this is not an error.
        if let Some(found) = response.extensions().get::<TimingScope>() {
            if !found.same(&scope) {
                return response;
            }
        }

        let duration = scope.elapsed();
        let meta = attributes::extract(&view, &self.global_tags);
        self.reporter.report(identity, duration, meta).await;

        response
    }

    /// Reporter used for span delivery.
    pub fn reporter(&self) -> &SpanReporter {
        &self.reporter
    }
}

// Implementation of Middleware trait
impl crate::middleware::middleware::Middleware for TracingMiddleware {
    fn apply(&self, router: axum::Router) -> axum::Router {
        let mw = self.clone();
        router.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| {
                let mw = mw.clone();
                async move { mw.middleware(request, next).await }
            },
        ))
    }
}
