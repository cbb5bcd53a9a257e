// Integration test harness setup.
//
// Each test gets its own trio of servers on ephemeral ports: an upstream
// echo server, a capture collector standing in for the trace agent, and
// the proxy under test wired together through the real pipeline assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Config, ConfigTrait};
use crate::controller::ProxyController;
use crate::http::{Controller, HttpServer, Middleware};
use crate::middleware::TracingMiddleware;
use crate::upstream::{BackendImpl, Upstream};

use super::collector::CollectorServer;
use super::upstream::UpstreamServer;

pub struct TestHarness {
    pub upstream: UpstreamServer,
    pub collector: CollectorServer,
    proxy_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestHarness {
    /// Starts the full pipeline with the stock test config.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts the full pipeline, letting the caller adjust the config
    /// after it has been pointed at the freshly started servers.
    pub async fn start_with<F: FnOnce(&mut Config)>(mutate: F) -> Self {
        Self::start_custom(mutate, Vec::new()).await
    }

    /// Starts the full pipeline with extra controllers registered before
    /// the catch-all proxy forwarder.
    pub async fn start_custom<F: FnOnce(&mut Config)>(
        mutate: F,
        extra_controllers: Vec<Box<dyn Controller>>,
    ) -> Self {
        let upstream = UpstreamServer::start().await;
        let collector = CollectorServer::start().await;

        let mut cfg = config::new_test_config();
        if let Some(backend) = cfg
            .proxy
            .upstream
            .as_mut()
            .and_then(|u| u.backend.as_mut())
        {
            backend.host = Some(upstream.addr().to_string());
        }
        if let Some(tracing) = cfg.proxy.tracing.as_mut() {
            tracing.agent_url = Some(collector.base_url());
        }
        mutate(&mut cfg);

        let shutdown = CancellationToken::new();
        let proxy_addr = serve_pipeline(shutdown.clone(), cfg, extra_controllers).await;

        Self {
            upstream,
            collector,
            proxy_addr,
            shutdown,
        }
    }

    pub fn proxy_url(&self) -> String {
        format!("http://{}", self.proxy_addr)
    }

    pub async fn close(&self) {
        self.shutdown.cancel();
        self.upstream.close().await;
        self.collector.close().await;
    }
}

/// Builds the real server composition (extra controllers first, then the
/// proxy forwarder, wrapped by the tracing middleware) and serves it on an
/// ephemeral listener. Returns the bound address.
pub async fn serve_pipeline(
    shutdown: CancellationToken,
    cfg: Config,
    extra_controllers: Vec<Box<dyn Controller>>,
) -> SocketAddr {
    let backend = Arc::new(
        BackendImpl::new(cfg.upstream().and_then(|u| u.backend.as_ref()).cloned())
            .expect("test backend config must be valid"),
    ) as Arc<dyn Upstream>;

    let mut controllers: Vec<Box<dyn Controller>> = extra_controllers;
    controllers.push(Box::new(ProxyController::new(backend)));

    let middlewares: Vec<Box<dyn Middleware>> = vec![Box::new(
        TracingMiddleware::new(cfg.tracing()).expect("test tracing config must be valid"),
    )];

    let server = HttpServer::new(shutdown.clone(), cfg, controllers, middlewares)
        .expect("test server must build");
    let router = server.router();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind proxy listener");
    let addr = listener.local_addr().expect("proxy local addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
    });

    addr
}
