// Package traces provides per-request trace identity, timing scopes and
// best-effort span export to the trace agent.

pub mod attributes;
pub mod ident;
pub mod propagation;
pub mod reporter;
pub mod scope;

#[cfg(test)]
mod attributes_test;

// Re-export commonly used types and constants
pub use attributes::{RequestView, ATTR_HTTP_HOST, ATTR_HTTP_METHOD, ATTR_HTTP_URL, ATTR_ORIGIN_IP};
pub use ident::{generate, TraceIdentity};
pub use propagation::{PARENT_ID_HEADER, SAMPLING_PRIORITY_HEADER, TRACE_ID_HEADER};
pub use reporter::{SpanRecord, SpanReporter, TracesError, TRACES_PATH};
pub use scope::{RequestScope, Scope, ScopeError, TimingScope};
