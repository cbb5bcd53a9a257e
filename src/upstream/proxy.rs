// Proxy forwarding functionality for upstream requests.

/// X-Forwarded-Host header key (lowercase for comparisons).
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Hop-by-hop headers that must not be forwarded by proxies (RFC 7230, section 6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// True when the header is hop-by-hop and must be stripped at the proxy.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Filters out hop-by-hop headers from a header list.
pub fn filter_hop_by_hop_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(key, _)| !is_hop_by_hop(key))
        .cloned()
        .collect()
}

/// Extracts the host to forward, preferring X-Forwarded-Host over Host.
/// Returns the value to set as the Host header of the outgoing request.
pub fn forwarded_host_value(src_headers: &[(String, String)]) -> Option<String> {
    // Prefer X-Forwarded-Host when present and non-empty.
    for (key, value) in src_headers {
        if key.eq_ignore_ascii_case(X_FORWARDED_HOST) && !value.is_empty() {
            return Some(value.clone());
        }
    }

    // Fall back to Host header.
    for (key, value) in src_headers {
        if key.eq_ignore_ascii_case("host") && !value.is_empty() {
            return Some(value.clone());
        }
    }

    None
}
