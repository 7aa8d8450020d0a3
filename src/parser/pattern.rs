//! Route and middleware path patterns.
//!
//! A pattern is a slash-delimited list of segments with an optional leading
//! `/`. Each segment is one of:
//!
//! - a literal such as `users` (an empty literal stands for two adjacent slashes),
//! - `{name}`, a wildcard whose matched text is bound to `name`,
//! - `*` or `{}`, a wildcard that binds nothing,
//! - `**`, only as the final segment, matching any number of trailing segments.

use std::fmt;
use std::mem;
use std::str::FromStr;

use crate::parser::error::Error;

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Whether this segment matches any single path segment.
    pub is_wildcard: bool,
    /// The literal text, or the parameter name of a wildcard (empty if anonymous).
    pub name: String,
}

impl Segment {
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            is_wildcard: false,
            name: name.into(),
        }
    }

    pub fn wildcard(name: impl Into<String>) -> Self {
        Self {
            is_wildcard: true,
            name: name.into(),
        }
    }

    /// Whether this segment accepts the given concrete path segment.
    pub fn accepts(&self, segment: &str) -> bool {
        self.is_wildcard || self.name == segment
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPattern {
    /// The segments in path order.
    pub segments: Vec<Segment>,
    /// Set when the pattern ends in `**`.
    pub suffix_wildcard: bool,
}

#[derive(Debug, Clone, Copy)]
enum State {
    BeforeSegment,
    InLiteral,
    BraceOpened,
    InName,
    BraceClosed,
    AfterStar,
}

impl PathPattern {
    /// The pattern matching only the root path `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a literal segment.
    pub fn literal(mut self, name: impl Into<String>) -> Self {
        debug_assert!(!self.suffix_wildcard, "no segment may follow '**'");
        self.segments.push(Segment::literal(name));
        self
    }

    /// Append a named wildcard segment.
    pub fn wildcard(mut self, name: impl Into<String>) -> Self {
        debug_assert!(!self.suffix_wildcard, "no segment may follow '**'");
        self.segments.push(Segment::wildcard(name));
        self
    }

    /// Append an anonymous wildcard segment.
    pub fn anonymous(self) -> Self {
        self.wildcard("")
    }

    /// Terminate the pattern with `**`.
    pub fn globstar(mut self) -> Self {
        self.suffix_wildcard = true;
        self
    }

    /// Number of segments, not counting a trailing `**`.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The `(segment index, name)` pairs of every named wildcard.
    pub fn param_bindings(&self) -> Vec<(usize, String)> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_wildcard && !s.name.is_empty())
            .map(|(i, s)| (i, s.name.clone()))
            .collect()
    }

    /// Parse a pattern string.
    ///
    /// # Arguments
    ///
    /// * `pattern` - The pattern text, e.g. `/users/{id}/**`
    ///
    /// # Returns
    ///
    /// The compiled pattern, or [`Error::MalformedPattern`] naming the byte
    /// offset at which the grammar was violated
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let malformed = |offset: usize, reason: &'static str| Error::MalformedPattern {
            pattern: pattern.to_string(),
            offset,
            reason,
        };

        let body = pattern.strip_prefix('/').unwrap_or(pattern);
        let base = pattern.len() - body.len();

        let mut pp = PathPattern::root();
        let mut state = State::BeforeSegment;
        let mut buf = String::new();

        for (idx, c) in body.char_indices() {
            let offset = base + idx;
            state = match state {
                State::BeforeSegment => match c {
                    '{' => State::BraceOpened,
                    '*' => State::AfterStar,
                    '/' => {
                        pp.segments.push(Segment::literal(""));
                        State::BeforeSegment
                    }
                    _ => {
                        buf.push(c);
                        State::InLiteral
                    }
                },
                State::InLiteral => match c {
                    '/' => {
                        pp.segments.push(Segment::literal(mem::take(&mut buf)));
                        State::BeforeSegment
                    }
                    _ => {
                        buf.push(c);
                        State::InLiteral
                    }
                },
                State::BraceOpened => match c {
                    '}' => {
                        pp.segments.push(Segment::wildcard(""));
                        State::BraceClosed
                    }
                    _ => {
                        buf.push(c);
                        State::InName
                    }
                },
                State::InName => match c {
                    '}' => {
                        pp.segments.push(Segment::wildcard(mem::take(&mut buf)));
                        State::BraceClosed
                    }
                    _ => {
                        buf.push(c);
                        State::InName
                    }
                },
                State::BraceClosed => match c {
                    '/' => State::BeforeSegment,
                    _ => return Err(malformed(offset, "expected '/' after '}'")),
                },
                State::AfterStar => match c {
                    '/' => {
                        pp.segments.push(Segment::wildcard(""));
                        State::BeforeSegment
                    }
                    '*' if offset + 1 == pattern.len() => {
                        pp.suffix_wildcard = true;
                        return Ok(pp);
                    }
                    '*' => return Err(malformed(offset, "'**' must terminate the pattern")),
                    _ => return Err(malformed(offset, "expected '/' or '*' after '*'")),
                },
            };
        }

        match state {
            State::BeforeSegment | State::BraceClosed => {}
            State::InLiteral => pp.segments.push(Segment::literal(buf)),
            State::BraceOpened | State::InName => {
                return Err(malformed(pattern.len(), "unterminated '{'"));
            }
            State::AfterStar => pp.segments.push(Segment::wildcard("")),
        }

        Ok(pp)
    }
}

impl FromStr for PathPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathPattern::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() && !self.suffix_wildcard {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match (segment.is_wildcard, segment.name.as_str()) {
                (true, "") => f.write_str("/*")?,
                (true, name) => write!(f, "/{{{name}}}")?,
                (false, name) => write!(f, "/{name}")?,
            }
        }
        if self.suffix_wildcard {
            f.write_str("/**")?;
        }
        Ok(())
    }
}

/// Anything that can be turned into a [`PathPattern`] at registration time.
pub trait IntoPattern {
    fn into_pattern(self) -> Result<PathPattern, Error>;
}

impl IntoPattern for PathPattern {
    fn into_pattern(self) -> Result<PathPattern, Error> {
        Ok(self)
    }
}

impl IntoPattern for &PathPattern {
    fn into_pattern(self) -> Result<PathPattern, Error> {
        Ok(self.clone())
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<PathPattern, Error> {
        PathPattern::parse(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<PathPattern, Error> {
        PathPattern::parse(&self)
    }
}

impl IntoPattern for &String {
    fn into_pattern(self) -> Result<PathPattern, Error> {
        PathPattern::parse(self)
    }
}
