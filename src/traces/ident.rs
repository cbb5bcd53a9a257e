// Trace identity generation.

use chrono::Utc;

/// Trace and span identifiers assigned to a single proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceIdentity {
    pub trace_id: u64,
    pub span_id: u64,
}

/// Derives a fresh identity from the wall clock at nanosecond resolution.
///
/// The trace id is monotonically increasing in practice but not
/// collision-proof: two requests landing on the same clock tick share an
/// id. The span id is always `trace_id + 1`. Safe to call concurrently,
/// there is no shared state.
pub fn generate() -> TraceIdentity {
    let trace_id = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    TraceIdentity {
        trace_id,
        span_id: trace_id.wrapping_add(1),
    }
}
