//! Endpoint handlers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::server::{Error, Request, Response};

/// Type alias for a handler function that fills in the response for a request.
///
/// Returning an error turns the response into an empty `500 Internal Server Error`.
pub type HandlerFn = Arc<dyn Fn(&mut Request, &mut Response) -> Result<(), Error> + Send + Sync>;

/// A handler registered for one method on one pattern.
pub(crate) struct Endpoint {
    /// `(segment index, name)` of every named wildcard in the pattern.
    pub path_params: Vec<(usize, String)>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Endpoint {
    pub fn new(path_params: Vec<(usize, String)>, handler: HandlerFn) -> Self {
        Self {
            path_params,
            handler,
        }
    }

    pub fn bind(&self, segments: &[String]) -> HashMap<String, String> {
        bind_params(&self.path_params, segments)
    }
}

/// Bind recorded wildcard positions to the concrete segments of a request path.
pub(crate) fn bind_params(bindings: &[(usize, String)], segments: &[String]) -> HashMap<String, String> {
    bindings
        .iter()
        .filter_map(|(idx, name)| segments.get(*idx).map(|value| (name.clone(), value.clone())))
        .collect()
}
