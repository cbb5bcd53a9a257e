// Package upstream provides backend functionality.

use anyhow::Result;

use crate::traces::Scope;

/// Upstream defines the interface for the origin backend.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Proxies a request to the upstream backend.
    ///
    /// When a request scope is supplied, its deadline tightens the
    /// configured timeout and its cancellation token aborts the call.
    async fn proxy_request(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
        scope: Option<&dyn Scope>,
    ) -> Result<Response>;
}

/// HTTP Response wrapper.
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}
