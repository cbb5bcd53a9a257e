// Main proxy application implementation.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigTrait};
use crate::upstream::{self, Upstream};

use super::server::{Http, HttpServer};

/// Encapsulates the entire proxy application state.
pub struct App {
    cfg: Config,
    shutdown_token: CancellationToken,
    #[allow(dead_code)]
    backend: Arc<dyn Upstream>,
    server: Arc<dyn Http>,
}

impl App {
    /// Creates a new proxy application instance.
    pub async fn new(shutdown_token: CancellationToken, cfg: Config) -> Result<Self> {
        let backend = Arc::new(upstream::BackendImpl::new(
            cfg.upstream().and_then(|u| u.backend.as_ref()).cloned(),
        )?) as Arc<dyn Upstream>;

        let http_server = Arc::new(HttpServer::new(
            shutdown_token.clone(),
            cfg.clone(),
            backend.clone(),
        )?) as Arc<dyn Http>;

        Ok(Self {
            cfg,
            shutdown_token,
            backend,
            server: http_server,
        })
    }

    /// Serves the proxy, handling graceful shutdown.
    pub async fn serve(&self, gsh: Arc<crate::shutdown::GracefulShutdown>) -> Result<()> {
        let server = self.server.clone();
        let app_for_close = self.clone();
        let gsh_clone = gsh.clone();

        tokio::task::spawn(async move {
            if let Err(e) = server.listen_and_serve().await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }

            if let Err(e) = app_for_close.close().await {
                error!(
                    component = "app",
                    scope = "shutdown",
                    event = "close_failed",
                    error = %e,
                    "application close failed"
                );
            }

            // Signal graceful shutdown
            gsh_clone.done();
        });

        info!(
            component = "app",
            event = "started",
            env = %self.cfg.proxy.env,
            "application lifecycle"
        );

        Ok(())
    }

    /// Checks whether the HTTP server is still alive.
    pub fn is_alive(&self) -> bool {
        if !self.server.is_alive() {
            warn!(
                component = "app",
                scope = "http_server",
                event = "gone_away",
                "http server has gone away"
            );
            return false;
        }
        true
    }

    /// Closes application resources.
    pub async fn close(&self) -> Result<()> {
        self.shutdown_token.cancel();

        info!(
            component = "app",
            event = "stopped",
            "application lifecycle"
        );

        Ok(())
    }
}

impl Clone for App {
    fn clone(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
            shutdown_token: self.shutdown_token.clone(),
            backend: self.backend.clone(),
            server: self.server.clone(),
        }
    }
}
