//! HTTP server implementation for woof-rs.
//!
//! This module provides the routing trie, path-scoped middleware, the
//! request/response types handed to handlers, and the server that accepts
//! connections and dispatches them to a fixed pool of worker threads.

mod config;
mod error;
mod handler;
mod http_server;
mod middleware;
mod pool;
mod request;
mod response;
mod router;

// Re-export public items
pub use config::ServerConfig;
pub use error::Error;
pub use handler::HandlerFn;
pub use http_server::HttpServer;
pub use middleware::{Middleware, MiddlewareHandle};
pub use request::{FromParam, Request};
pub use response::{Response, StatusCode, DEFAULT_CONTENT_TYPE};
