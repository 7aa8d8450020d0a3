//! Parsers for everything the server reads.
//!
//! This module holds the wire-level request head parser, the request target
//! decoder, and the path pattern grammar used at registration time.

mod error;
mod headers;
mod method;
mod pattern;
mod request;
mod target;
mod version;
mod tests;

// Re-export public items
pub use error::Error;
pub use headers::HeaderMap;
pub use method::Method;
pub use pattern::{IntoPattern, PathPattern, Segment};
pub use request::{find_head_end, parse_request_head, RequestHead};
pub use target::ParsedTarget;
pub use version::HttpVersion;
