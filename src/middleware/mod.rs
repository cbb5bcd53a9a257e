// HTTP middlewares applied to the proxy router.

pub mod middleware;
pub mod tracing_middleware;


pub use middleware::Middleware;
pub use tracing_middleware::TracingMiddleware;
