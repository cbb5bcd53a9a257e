// HTTP server assembly for the proxy application.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigTrait};
use crate::http::{Controller, Middleware, Server as HttpServerTrait};
use crate::middleware::TracingMiddleware;
use crate::upstream::Upstream;

/// Http exposes the server operations the app depends on.
#[async_trait::async_trait]
pub trait Http: Send + Sync {
    /// Starts the server (blocking call).
    async fn listen_and_serve(&self) -> Result<()>;

    /// Returns true while the server is serving.
    fn is_alive(&self) -> bool;
}

/// HTTP server implementation that wraps all dependencies.
pub struct HttpServer {
    #[allow(dead_code)]
    ctx: CancellationToken,
    server: Arc<dyn HttpServerTrait>,
    is_server_alive: Arc<AtomicBool>,
}

impl HttpServer {
    /// Creates a new HttpServer with all controllers and middlewares wired.
    /// Returns an error if initialization fails.
    pub fn new(ctx: CancellationToken, cfg: Config, backend: Arc<dyn Upstream>) -> Result<Self> {
        let server = Self::make_http_server(ctx.clone(), &cfg, backend)?;

        Ok(Self {
            ctx,
            server,
            is_server_alive: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates the HTTP server instance with controllers and middlewares.
    fn make_http_server(
        ctx: CancellationToken,
        cfg: &Config,
        backend: Arc<dyn Upstream>,
    ) -> Result<Arc<dyn HttpServerTrait>> {
        let controllers = Self::controllers(cfg, backend);
        let middlewares = Self::middlewares(cfg)?;

        // Compose server with controllers and middlewares.
        let server = crate::http::HttpServer::new(ctx, cfg.clone(), controllers, middlewares)?;
        Ok(server as Arc<dyn HttpServerTrait>)
    }

    /// Returns all HTTP controllers for the server.
    fn controllers(cfg: &Config, backend: Arc<dyn Upstream>) -> Vec<Box<dyn Controller>> {
        let mut controllers: Vec<Box<dyn Controller>> = Vec::new();

        // Metrics endpoint
        if cfg.metrics().map(|m| m.enabled).unwrap_or(false) {
            controllers.push(Box::new(
                crate::controller::PrometheusMetricsController::new(),
            ));
        }

        // Main proxy handler
        controllers.push(Box::new(crate::controller::ProxyController::new(backend)));

        controllers
    }

    /// Returns the request middlewares for the server, executed in reverse order.
    fn middlewares(cfg: &Config) -> Result<Vec<Box<dyn Middleware>>> {
        Ok(vec![
            // Request tracing and span export
            Box::new(TracingMiddleware::new(cfg.tracing())?),
        ])
    }
}

#[async_trait::async_trait]
impl Http for HttpServer {
    async fn listen_and_serve(&self) -> Result<()> {
        self.is_server_alive.store(true, Ordering::Relaxed);

        let result = self.server.listen_and_serve().await;

        self.is_server_alive.store(false, Ordering::Relaxed);
        result
    }

    fn is_alive(&self) -> bool {
        self.is_server_alive.load(Ordering::Relaxed)
    }
}
