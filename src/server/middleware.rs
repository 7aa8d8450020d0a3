//! Path-scoped middleware.
//!
//! Middleware is registered against a pattern together with a factory. Every
//! request gets fresh instances of each middleware whose pattern applies to
//! its path; they are dropped when the request ends.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::parser::PathPattern;
use crate::server::handler::bind_params;
use crate::server::{Request, Response};

/// Hooks run around an endpoint handler.
///
/// `before` hooks run from the most specific applicable middleware to the
/// least specific one, then the handler, then `after` hooks in exactly the
/// reverse order.
pub trait Middleware: Send + 'static {
    fn before(&mut self, _req: &mut Request, _resp: &mut Response) {}

    fn after(&mut self, _req: &mut Request, _resp: &mut Response) {}
}

/// Object-safe view of a middleware instance that can be downcast again.
pub(crate) trait MiddlewareObject: Send {
    fn before(&mut self, req: &mut Request, resp: &mut Response);
    fn after(&mut self, req: &mut Request, resp: &mut Response);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Middleware> MiddlewareObject for M {
    fn before(&mut self, req: &mut Request, resp: &mut Response) {
        Middleware::before(self, req, resp)
    }

    fn after(&mut self, req: &mut Request, resp: &mut Response) {
        Middleware::after(self, req, resp)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle returned when a middleware is registered.
///
/// Handlers pass it to [`Request::middleware`] to reach the instance created
/// for the current request.
pub struct MiddlewareHandle<M> {
    index: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> MiddlewareHandle<M> {
    /// The registration index of the middleware.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<M> Clone for MiddlewareHandle<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for MiddlewareHandle<M> {}

impl<M> fmt::Debug for MiddlewareHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareHandle").field("index", &self.index).finish()
    }
}

type Creator = Box<dyn Fn() -> Box<dyn MiddlewareObject> + Send + Sync>;

pub(crate) struct MiddlewareEntry {
    pub pattern: PathPattern,
    creator: Creator,
    path_params: Vec<(usize, String)>,
    pub index: usize,
}

impl MiddlewareEntry {
    /// Whether this entry applies to a request with the given path segments.
    ///
    /// Literal segments must match position by position. A pattern shorter
    /// than the path only applies when it ends in `**`.
    pub fn applies_to(&self, segments: &[String]) -> bool {
        let plen = self.pattern.len();
        if plen > segments.len() {
            return false;
        }
        let prefix_matches = self
            .pattern
            .segments
            .iter()
            .zip(segments)
            .all(|(pattern, actual)| pattern.accepts(actual));
        prefix_matches && (self.pattern.suffix_wildcard || plen == segments.len())
    }

    pub fn instantiate(&self) -> Box<dyn MiddlewareObject> {
        (self.creator)()
    }

    pub fn bind(&self, segments: &[String]) -> HashMap<String, String> {
        bind_params(&self.path_params, segments)
    }
}

#[derive(Default)]
pub(crate) struct MiddlewareRegistry {
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewareRegistry {
    pub fn register<M, F>(&mut self, pattern: PathPattern, factory: F) -> MiddlewareHandle<M>
    where
        M: Middleware,
        F: Fn() -> M + Send + Sync + 'static,
    {
        let index = self.entries.len();
        self.entries.push(MiddlewareEntry {
            path_params: pattern.param_bindings(),
            pattern,
            creator: Box::new(move || -> Box<dyn MiddlewareObject> { Box::new(factory()) }),
            index,
        });
        MiddlewareHandle {
            index,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[MiddlewareEntry] {
        &self.entries
    }

    /// The entries applying to `segments`, in `before` order.
    pub fn resolve(&self, segments: &[String]) -> Vec<&MiddlewareEntry> {
        let rlen = segments.len();
        let mut matched: Vec<&MiddlewareEntry> =
            self.entries.iter().filter(|entry| entry.applies_to(segments)).collect();
        matched.sort_by(|a, b| specificity(a, b, rlen));
        matched
    }
}

/// Patterns as long as the path come first, then shorter patterns, then
/// earlier registrations.
fn specificity(a: &MiddlewareEntry, b: &MiddlewareEntry, rlen: usize) -> Ordering {
    let (alen, blen) = (a.pattern.len(), b.pattern.len());
    (blen == rlen)
        .cmp(&(alen == rlen))
        .then(alen.cmp(&blen))
        .then(a.index.cmp(&b.index))
}
