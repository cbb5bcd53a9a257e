//! Upstream backend functionality for proxying requests to the origin server.

pub mod backend;
pub mod proxy;
pub mod upstream;


// Re-export main types
pub use backend::BackendImpl;
pub use upstream::{Response, Upstream};
