// Upstream echo server used by the integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::header;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// One request as observed by the upstream.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    /// Returns the first header with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal origin server recording every request it receives.
pub struct UpstreamServer {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown: CancellationToken,
}

impl UpstreamServer {
    /// Binds an ephemeral port and starts serving.
    pub async fn start() -> Self {
        let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorder = {
            let seen = seen.clone();
            move |request: axum::extract::Request| {
                let seen = seen.clone();
                async move {
                    let mut headers = Vec::new();
                    for (name, value) in request.headers() {
                        if let Ok(value_str) = value.to_str() {
                            headers.push((name.as_str().to_string(), value_str.to_string()));
                        }
                    }
                    seen.lock().unwrap().push(SeenRequest {
                        method: request.method().to_string(),
                        path: request.uri().path().to_string(),
                        headers,
                    });

                    (
                        [(header::CONTENT_TYPE, "application/json")],
                        r#"{"ok":true,"from":"upstream"}"#,
                    )
                }
            }
        };

        let app = Router::new()
            .route("/", any(recorder.clone()))
            .route("/*path", any(recorder));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream listener");
        let addr = listener.local_addr().expect("upstream local addr");

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
        });

        Self {
            addr,
            seen,
            shutdown,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The most recent request, if any.
    pub fn last_seen(&self) -> Option<SeenRequest> {
        self.seen.lock().unwrap().last().cloned()
    }

    /// Number of requests the upstream has served.
    pub fn seen_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub async fn close(&self) {
        self.shutdown.cancel();
    }
}
