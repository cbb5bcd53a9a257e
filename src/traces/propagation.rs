// Outbound trace-header propagation.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::ident::TraceIdentity;

/// Header carrying the trace id downstream.
pub const TRACE_ID_HEADER: &str = "x-datadog-trace-id";
/// Header carrying the id downstream services adopt as their parent span.
pub const PARENT_ID_HEADER: &str = "x-datadog-parent-id";
/// Header carrying the sampling directive.
pub const SAMPLING_PRIORITY_HEADER: &str = "x-datadog-sampling-priority";

/// Keep-always sampling priority.
const SAMPLING_PRIORITY_KEEP: &str = "1";

/// Writes the trace identity into the outbound headers so downstream
/// services can continue the trace. Pre-existing values are overwritten.
/// Must run before the request reaches the downstream handler.
pub fn inject(headers: &mut HeaderMap, identity: &TraceIdentity) {
    set_decimal(headers, TRACE_ID_HEADER, identity.trace_id);
    set_decimal(headers, PARENT_ID_HEADER, identity.span_id);
    if let Ok(name) = HeaderName::try_from(SAMPLING_PRIORITY_HEADER) {
        headers.insert(name, HeaderValue::from_static(SAMPLING_PRIORITY_KEEP));
    }
}

fn set_decimal(headers: &mut HeaderMap, header: &str, id: u64) {
    if let Ok(name) = HeaderName::try_from(header) {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            headers.insert(name, value);
        }
    }
}
