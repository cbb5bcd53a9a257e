// Trace-agent capture server used by the integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::traces::TRACES_PATH;

/// Fake trace agent that records every payload POSTed to the trace
/// intake endpoint. Can be switched into a failing mode where it keeps
/// recording but answers with a server error.
pub struct CollectorServer {
    addr: SocketAddr,
    payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl CollectorServer {
    /// Binds an ephemeral port and starts serving the intake endpoint.
    pub async fn start() -> Self {
        let payloads: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
        let content_types: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(AtomicBool::new(false));

        let intake = {
            let payloads = payloads.clone();
            let content_types = content_types.clone();
            let failing = failing.clone();
            move |headers: axum::http::HeaderMap, body: axum::body::Bytes| {
                let payloads = payloads.clone();
                let content_types = content_types.clone();
                let failing = failing.clone();
                async move {
                    let content_type = headers
                        .get(axum::http::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    content_types.lock().unwrap().push(content_type);

                    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) {
                        payloads.lock().unwrap().push(value);
                    }
                    if failing.load(Ordering::Relaxed) {
                        (StatusCode::INTERNAL_SERVER_ERROR, "collector unavailable")
                    } else {
                        (StatusCode::OK, "OK")
                    }
                }
            }
        };

        let app = Router::new().route(TRACES_PATH, post(intake));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind collector listener");
        let addr = listener.local_addr().expect("collector local addr");

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
        });

        Self {
            addr,
            payloads,
            content_types,
            failing,
            shutdown,
        }
    }

    /// Base URL the middleware should use as the agent address.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// All spans received so far, flattened out of their trace envelopes.
    pub fn spans(&self) -> Vec<serde_json::Value> {
        let mut spans = Vec::new();
        for payload in self.payloads.lock().unwrap().iter() {
            if let Some(traces) = payload.as_array() {
                for trace in traces {
                    if let Some(list) = trace.as_array() {
                        spans.extend(list.iter().cloned());
                    }
                }
            }
        }
        spans
    }

    /// Raw intake payloads, one entry per POST.
    pub fn payload_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Content types of the intake POSTs, in arrival order.
    pub fn content_types(&self) -> Vec<String> {
        self.content_types.lock().unwrap().clone()
    }

    /// Switches the intake into or out of the failing mode.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub async fn close(&self) {
        self.shutdown.cancel();
    }
}
