//! Integration tests for the edgetrace proxy.
//!
//! End-to-end cases that drive the real pipeline: proxy server, tracing
//! middleware, upstream echo server and a capture collector standing in
//! for the trace agent.


pub mod support;
