//! Shared hyper HTTP client.
//!
//! One pooled client type serves both outbound concerns of the proxy:
//! forwarding requests to the upstream backend and delivering span
//! payloads to the trace agent. HTTP/1.1 only, so the Host header is sent
//! as a regular header rather than `:authority`.

use std::time::Duration;

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::dns::GaiResolver;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Connection pool configuration constants.
pub const CONNS_PER_HOST: usize = 512;
pub const MAX_IDLE_CONN_DURATION: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub type HyperClient =
    Client<HttpsConnector<HttpConnector<GaiResolver>>, BoxBody<Bytes, hyper::Error>>;

/// Creates the pooled hyper client.
///
/// Uses `BoxBody` for requests (supports Empty/Full) and accepts both
/// plain-HTTP and TLS destinations, so the same client can talk to a local
/// agent and a TLS-fronted backend.
pub fn create_client() -> HyperClient {
    let resolver = GaiResolver::new();

    let mut http_connector = HttpConnector::new_with_resolver(resolver);
    http_connector.set_nodelay(true);
    http_connector.set_keepalive(Some(TCP_KEEPALIVE));
    http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));

    let tls = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("Failed to load native root certificates")
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(MAX_IDLE_CONN_DURATION)
        .pool_max_idle_per_host(CONNS_PER_HOST)
        .retry_canceled_requests(true)
        .build(tls)
}
