//! An embeddable HTTP/1.1 server with a pattern router.
//!
//! Applications register handlers against path patterns and attach
//! middleware to path scopes; the server decodes each request target, picks
//! the most specific endpoint and runs the applicable middleware around it.
//!
//! # Features
//!
//! - Path patterns with literal, named (`{id}`), anonymous (`*`) and trailing (`**`) segments
//! - Trie routing that prefers literal segments and falls back to the deepest `**` endpoint
//! - Path-scoped middleware with per-request instances and onion ordering
//! - Percent-decoding of paths and query strings, with typed parameter access
//! - JSON request and response bodies through serde
//! - A fixed pool of worker threads behind a bounded connection queue
//!
//! # Examples
//!
//! ## Patterns
//!
//! ```
//! use woof_rs::PathPattern;
//!
//! let pattern = PathPattern::parse("/hello/{lang}/**").unwrap();
//! assert_eq!(pattern.len(), 2);
//! assert!(pattern.suffix_wildcard);
//!
//! // `**` may only end a pattern
//! assert!(PathPattern::parse("/a/**/b").is_err());
//! ```
//!
//! ## Request targets
//!
//! ```
//! use woof_rs::ParsedTarget;
//!
//! let target = ParsedTarget::parse("/files/a%2Fb?q=rust+lang&page=2");
//! assert!(target.success);
//! assert_eq!(target.path_segments, ["files", "a/b"]);
//! assert_eq!(target.query_params[0], ("q".to_string(), "rust lang".to_string()));
//!
//! assert!(!ParsedTarget::parse("/bad%zz").success);
//! ```
//!
//! ## A server
//!
//! ```no_run
//! use woof_rs::{HttpServer, ServerConfig};
//!
//! # fn main() -> Result<(), woof_rs::ServerError> {
//! let mut server = HttpServer::new(ServerConfig::default().with_port(8080));
//!
//! server.get("/hello/{lang}", |req, resp| {
//!     let a: i32 = req.query_or("a", 42);
//!     let b: i32 = req.query_or("b", 0);
//!     resp.write(format!("Hello, {}!\n", a + b));
//!     Ok(())
//! })?;
//!
//! // Blocks until SIGINT or SIGTERM
//! server.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! See `demos/hello.rs` for a server with middleware.

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

/// The crate version, reported when the server starts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used items for convenience
pub use parser::{
    parse_request_head, Error as ParserError, HeaderMap, HttpVersion, IntoPattern, Method, ParsedTarget, PathPattern,
    RequestHead,
};
pub use server::{
    Error as ServerError, FromParam, HandlerFn, HttpServer, Middleware, MiddlewareHandle, Request, Response,
    ServerConfig, StatusCode,
};
