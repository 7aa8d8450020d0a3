//! Request target decoding.
//!
//! Splits a raw request target into its path and query components while
//! percent-decoding both. Structure is always taken from the raw text, so an
//! encoded `%2F` or `%3F` never acts as a path or query delimiter.

use std::mem;

/// The components of a decoded request target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTarget {
    /// False if the target contained a malformed percent-escape or decoded to invalid UTF-8.
    pub success: bool,
    /// The whole target, percent-decoded.
    pub decoded: String,
    /// The path as it appeared on the request line.
    pub path_raw: String,
    /// The decoded path.
    pub path: String,
    /// The decoded path segments, split on raw `/` after an optional leading `/`.
    pub path_segments: Vec<String>,
    /// The query string as it appeared on the request line, without the `?`.
    pub query_raw: String,
    /// The decoded query string, with `+` read as a space.
    pub query: String,
    /// Decoded `(key, value)` pairs in order of appearance.
    pub query_params: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Path,
    QueryName,
    QueryValue,
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn text(buf: Vec<u8>) -> Option<String> {
    String::from_utf8(buf).ok()
}

impl ParsedTarget {
    /// Parse a raw request target such as `/search?q=rust+lang&page=2`.
    ///
    /// Never fails outright; check [`ParsedTarget::success`].
    pub fn parse(raw: &str) -> Self {
        Self::scan(raw).unwrap_or_default()
    }

    fn scan(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();

        let mut decoded = Vec::with_capacity(bytes.len());
        let mut path = Vec::with_capacity(bytes.len());
        let mut query = Vec::new();
        let mut path_segments = Vec::new();
        let mut query_params = Vec::new();

        let mut segment = Vec::new();
        let mut key = Vec::new();
        let mut value = Vec::new();

        let mut state = State::Path;
        let mut path_end = bytes.len();
        let mut idx = 0;

        if bytes.first() == Some(&b'/') {
            decoded.push(b'/');
            path.push(b'/');
            idx = 1;
        }

        while idx < bytes.len() {
            let c = bytes[idx];

            if c == b'%' {
                let high = bytes.get(idx + 1).copied().and_then(hex_value)?;
                let low = bytes.get(idx + 2).copied().and_then(hex_value)?;
                let byte = 16 * high + low;
                decoded.push(byte);
                match state {
                    State::Path => {
                        path.push(byte);
                        segment.push(byte);
                    }
                    State::QueryName => {
                        query.push(byte);
                        key.push(byte);
                    }
                    State::QueryValue => {
                        query.push(byte);
                        value.push(byte);
                    }
                }
                idx += 3;
                continue;
            }

            decoded.push(c);

            match state {
                State::Path => match c {
                    b'?' => {
                        path_end = idx;
                        path_segments.push(text(mem::take(&mut segment))?);
                        state = State::QueryName;
                    }
                    b'/' => {
                        path.push(c);
                        path_segments.push(text(mem::take(&mut segment))?);
                    }
                    _ => {
                        path.push(c);
                        segment.push(c);
                    }
                },
                State::QueryName | State::QueryValue => {
                    let c = if c == b'+' { b' ' } else { c };
                    query.push(c);
                    match (state, c) {
                        (_, b'&') => {
                            push_pair(&mut query_params, &mut key, &mut value)?;
                            state = State::QueryName;
                        }
                        (State::QueryName, b'=') => state = State::QueryValue,
                        (State::QueryName, _) => key.push(c),
                        _ => value.push(c),
                    }
                }
            }

            idx += 1;
        }

        match state {
            State::Path => path_segments.push(text(segment)?),
            _ => push_pair(&mut query_params, &mut key, &mut value)?,
        }

        let (path_raw, query_raw) = match bytes.get(path_end) {
            Some(b'?') => (&raw[..path_end], &raw[path_end + 1..]),
            _ => (raw, ""),
        };

        Some(Self {
            success: true,
            decoded: text(decoded)?,
            path_raw: path_raw.to_string(),
            path: text(path)?,
            path_segments,
            query_raw: query_raw.to_string(),
            query: text(query)?,
            query_params,
        })
    }
}

/// Close the current query pair. Every `&`-delimited fragment produces a
/// pair, so `a=1&&b` yields an empty `("", "")` between the two.
fn push_pair(params: &mut Vec<(String, String)>, key: &mut Vec<u8>, value: &mut Vec<u8>) -> Option<()> {
    params.push((text(mem::take(key))?, text(mem::take(value))?));
    Some(())
}
