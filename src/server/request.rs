//! The request seen by handlers and middleware.

use std::collections::HashMap;
use std::mem;

use serde::de::DeserializeOwned;

use crate::parser::{Error as ParserError, HeaderMap, HttpVersion, Method, ParsedTarget, RequestHead};
use crate::server::error::Error;
use crate::server::middleware::{Middleware, MiddlewareHandle, MiddlewareObject};

/// Conversion from a path or query parameter to a typed value.
pub trait FromParam: Sized {
    /// Convert `value`, or return `None` if it does not represent a `Self`.
    fn from_param(value: &str) -> Option<Self>;
}

macro_rules! from_param_via_from_str {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromParam for $t {
                fn from_param(value: &str) -> Option<Self> {
                    value.parse().ok()
                }
            }
        )*
    };
}

from_param_via_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
);

/// An empty value counts as `true`, so `?verbose` enables a flag.
impl FromParam for bool {
    fn from_param(value: &str) -> Option<Self> {
        match value {
            "" | "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" => Some(false),
            _ => None,
        }
    }
}

/// Represents an HTTP request being dispatched.
pub struct Request {
    method: Method,
    version: HttpVersion,
    target_raw: String,
    target: ParsedTarget,
    path_params: HashMap<String, String>,
    headers: HeaderMap,
    body: Vec<u8>,
    middlewares: Vec<Option<Box<dyn MiddlewareObject>>>,
}

impl Request {
    /// Build a request from its parsed head and decoded target.
    ///
    /// `middleware_slots` is the number of registered middleware; slots of
    /// middleware that do not apply to this request stay empty.
    pub(crate) fn new(head: RequestHead, target: ParsedTarget, middleware_slots: usize) -> Self {
        let mut middlewares = Vec::with_capacity(middleware_slots);
        middlewares.resize_with(middleware_slots, || None);
        Self {
            method: head.method,
            version: head.version,
            target_raw: head.target,
            target,
            path_params: HashMap::new(),
            headers: head.headers,
            body: Vec::new(),
            middlewares,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// The percent-decoded request target.
    pub fn target(&self) -> &str {
        &self.target.decoded
    }

    /// The request target exactly as it appeared on the request line.
    pub fn target_raw(&self) -> &str {
        &self.target_raw
    }

    /// The decoded path.
    pub fn path(&self) -> &str {
        &self.target.path
    }

    pub fn path_raw(&self) -> &str {
        &self.target.path_raw
    }

    /// The decoded path segments used for routing.
    pub fn path_segments(&self) -> &[String] {
        &self.target.path_segments
    }

    /// Path parameters bound by the pattern of the code currently running:
    /// the endpoint inside a handler, the middleware's own pattern inside a hook.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn param_as<T: FromParam>(&self, name: &str) -> Option<T> {
        self.param(name).and_then(T::from_param)
    }

    pub fn param_or<T: FromParam>(&self, name: &str, default: T) -> T {
        self.param_as(name).unwrap_or(default)
    }

    /// The first value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.target
            .query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a query parameter, in the order they appeared.
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.target
            .query_params
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.query(name).is_some()
    }

    /// Convert the first value of a query parameter.
    pub fn query_as<T: FromParam>(&self, name: &str) -> Option<T> {
        self.query(name).and_then(T::from_param)
    }

    /// Convert the first value of a query parameter, falling back to `default`
    /// when it is missing or not convertible.
    pub fn query_or<T: FromParam>(&self, name: &str, default: T) -> T {
        self.query_as(name).unwrap_or(default)
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.target.query_params
    }

    /// The decoded query string, with `+` read as a space.
    pub fn query_string(&self) -> &str {
        &self.target.query
    }

    pub fn query_string_raw(&self) -> &str {
        &self.target.query_raw
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get a header value. Names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the Content-Type is not
    /// `application/json` or the body is not valid JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(ParserError::MissingHeader("Content-Type: application/json".to_string()).into());
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The instance of a registered middleware created for this request.
    ///
    /// Returns `None` if the middleware's pattern does not apply to this
    /// request, or when called from that middleware's own hooks.
    pub fn middleware<M: Middleware>(&self, handle: MiddlewareHandle<M>) -> Option<&M> {
        self.middlewares
            .get(handle.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<M>()
    }

    pub fn middleware_mut<M: Middleware>(&mut self, handle: MiddlewareHandle<M>) -> Option<&mut M> {
        self.middlewares
            .get_mut(handle.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<M>()
    }

    pub(crate) fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Install the parameter bindings for the next hook or handler, returning the previous ones.
    pub(crate) fn swap_params(&mut self, params: HashMap<String, String>) -> HashMap<String, String> {
        mem::replace(&mut self.path_params, params)
    }

    pub(crate) fn put_middleware(&mut self, index: usize, instance: Box<dyn MiddlewareObject>) {
        if let Some(slot) = self.middlewares.get_mut(index) {
            *slot = Some(instance);
        }
    }

    pub(crate) fn take_middleware(&mut self, index: usize) -> Option<Box<dyn MiddlewareObject>> {
        self.middlewares.get_mut(index)?.take()
    }

    /// Drop every middleware instance created for this request.
    pub(crate) fn drop_middlewares(&mut self) {
        self.middlewares.clear();
    }
}
