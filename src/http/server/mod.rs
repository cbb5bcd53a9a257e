// HTTP server module.

pub mod server;

pub use server::{HttpServer, Server};
