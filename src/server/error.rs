//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing a request head or a registration pattern.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The request target contained a malformed percent-escape.
    #[error("Malformed request target: {0}")]
    MalformedTarget(String),

    /// No endpoint matches the request method and path.
    #[error("Not found: {0} {1}")]
    NotFound(Method, String),

    /// An endpoint with the same method and pattern is already registered.
    #[error("Endpoint {0} {1} is already registered")]
    DuplicateEndpoint(Method, String),

    /// The request head exceeded the configured limit.
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// The request body exceeded the configured limit.
    #[error("Request body of {0} bytes exceeds the limit of {1} bytes")]
    PayloadTooLarge(usize, usize),

    /// Internal server error, usually raised by a handler.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
