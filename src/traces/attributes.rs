//! Span attribute extraction.
//!
//! Every emitted span carries the statically configured global tags merged
//! with attributes derived from the request itself. Request-derived values
//! are written after the global tags and therefore win on key collision.

use std::collections::HashMap;

use axum::http::{header, HeaderMap, Request, Uri};

// Attribute key constants
pub const ATTR_HTTP_METHOD: &str = "http.method";
pub const ATTR_HTTP_URL: &str = "http.url";
pub const ATTR_HTTP_HOST: &str = "http.host";
pub const ATTR_ORIGIN_IP: &str = "origin_ip";
pub const ATTR_LANGUAGE: &str = "language";
pub const ATTR_SPAN_KIND: &str = "span.kind";

/// Inbound headers consulted for origin-IP attribution.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Fixed marker values attached to every span.
const LANGUAGE_MARKER: &str = "go";
const SPAN_KIND_CLIENT: &str = "client";

/// Request fields sampled before the request is handed downstream.
///
/// The request itself is consumed by the next handler, so everything the
/// attribute set needs is captured up front.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    pub method: String,
    pub path: String,
    pub host: String,
    pub forwarded_for: String,
    pub real_ip: String,
}

impl RequestView {
    /// Samples the attribute sources from an inbound request.
    pub fn capture<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().as_str().to_string(),
            path: req.uri().path().to_string(),
            host: host_of(req.headers(), req.uri()),
            forwarded_for: header_str(req.headers(), X_FORWARDED_FOR),
            real_ip: header_str(req.headers(), X_REAL_IP),
        }
    }
}

/// Builds the span attribute set for one request.
pub fn extract(view: &RequestView, global_tags: &HashMap<String, String>) -> HashMap<String, String> {
    let mut attributes = HashMap::with_capacity(global_tags.len() + 6);

    // Global tags first, request attributes after.
    for (key, value) in global_tags {
        attributes.insert(key.clone(), value.clone());
    }

    attributes.insert(ATTR_HTTP_METHOD.to_string(), view.method.clone());
    attributes.insert(ATTR_HTTP_URL.to_string(), view.path.clone());
    attributes.insert(ATTR_HTTP_HOST.to_string(), view.host.clone());
    attributes.insert(ATTR_ORIGIN_IP.to_string(), origin_ip(view));
    attributes.insert(ATTR_LANGUAGE.to_string(), LANGUAGE_MARKER.to_string());
    attributes.insert(ATTR_SPAN_KIND.to_string(), SPAN_KIND_CLIENT.to_string());

    attributes
}

/// Resolves the original client address from the proxy-chain headers.
///
/// A non-empty X-Forwarded-For wins; only the left-most address in the
/// chain is used. Falls back to X-Real-Ip, which may be empty. Absent
/// headers yield an empty string, never an error.
pub fn origin_ip(view: &RequestView) -> String {
    let forwarded = view.forwarded_for.as_str();
    if !forwarded.is_empty() {
        if let Some(comma) = forwarded.find(',') {
            if comma > 0 {
                return forwarded[..comma].trim().to_string();
            }
        }
        return forwarded.trim().to_string();
    }
    view.real_ip.clone()
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn host_of(headers: &HeaderMap, uri: &Uri) -> String {
    let host = header_str(headers, header::HOST.as_str());
    if !host.is_empty() {
        return host;
    }
    uri.host().unwrap_or("").to_string()
}
