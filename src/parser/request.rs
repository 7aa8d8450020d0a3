//! HTTP request head parsing.

use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::headers::HeaderMap;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// The request line and header section of an HTTP request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw request target, still percent-encoded
    pub target: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HeaderMap,
}

impl RequestHead {
    /// The declared body length.
    ///
    /// # Returns
    ///
    /// `0` when no Content-Length header is present, or an error if the
    /// header is not a non-negative integer
    pub fn content_length(&self) -> Result<usize, Error> {
        match self.headers.get("Content-Length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string())),
            None => Ok(0),
        }
    }
}

/// Find the end of the request head in a buffer.
///
/// # Returns
///
/// The offset just past the blank line terminating the header section, if the
/// buffer contains one. Bare `\n` line endings are accepted.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    for (i, &byte) in buf.iter().enumerate() {
        if byte != b'\n' {
            continue;
        }
        match (buf.get(i + 1), buf.get(i + 2)) {
            (Some(b'\n'), _) => return Some(i + 2),
            (Some(b'\r'), Some(b'\n')) => return Some(i + 3),
            _ => {}
        }
    }
    None
}

/// Parse an HTTP request head from a byte slice.
///
/// # Arguments
///
/// * `input` - A byte slice holding the request line and headers. Anything
///   after the blank line that ends the header section is ignored.
///
/// # Returns
///
/// The parsed request head, or an error if the request is invalid
pub fn parse_request_head(input: &[u8]) -> Result<RequestHead, Error> {
    // Convert the input to a string
    let input_str = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    // Split the input into lines
    let mut lines = input_str.lines();

    // Parse the request line
    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1].to_string();
    if target.is_empty() {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    // Parse the headers
    let mut headers = HeaderMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat);
        }

        headers.append(name, value.trim());
    }

    // Check for required headers
    if version.requires_host() && !headers.contains("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    Ok(RequestHead {
        method,
        target,
        version,
        headers,
    })
}
