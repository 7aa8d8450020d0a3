//! Trie router resolving request paths to endpoints.
//!
//! Nodes live in an arena owned by the [`Router`] and refer to each other by
//! [`NodeId`]. Every node has literal children keyed by segment text, at most
//! one wildcard child shared by all wildcard names, and two handler tables:
//! exact handlers for paths ending at the node, and globstar handlers for
//! patterns ending in `**` at the node.

use std::collections::HashMap;

use crate::parser::{Method, PathPattern};
use crate::server::error::Error;
use crate::server::handler::{Endpoint, HandlerFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

#[derive(Default)]
pub(crate) struct RouterNode {
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    wildcard: Option<NodeId>,
    handlers: HashMap<Method, Endpoint>,
    globstar_handlers: HashMap<Method, Endpoint>,
}

/// The endpoint selected for a request.
pub(crate) struct RouteMatch<'a> {
    pub endpoint: &'a Endpoint,
    /// Whether the endpoint came from a `**` pattern.
    pub globstar: bool,
    pub node: NodeId,
}

pub(crate) struct Router {
    nodes: Vec<RouterNode>,
    routes: Vec<(Method, PathPattern)>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![RouterNode::default()],
            routes: Vec::new(),
        }
    }

    fn node(&self, id: NodeId) -> &RouterNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut RouterNode {
        &mut self.nodes[id.0]
    }

    fn add_node(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RouterNode {
            parent: Some(parent),
            ..RouterNode::default()
        });
        id
    }

    /// The registered `(method, pattern)` pairs in registration order.
    pub fn routes(&self) -> &[(Method, PathPattern)] {
        &self.routes
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Number of segments between the root and `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        std::iter::successors(self.parent(id), |&p| self.parent(p)).count()
    }

    /// Register `handler` for `method` on `pattern`.
    ///
    /// Wildcard names do not affect the trie shape, so `/a/{x}` and `/a/{y}`
    /// land on the same node and count as the same endpoint.
    pub fn insert(&mut self, method: Method, pattern: PathPattern, handler: HandlerFn) -> Result<(), Error> {
        let mut node = Self::ROOT;
        for segment in &pattern.segments {
            let next = if segment.is_wildcard {
                self.node(node).wildcard
            } else {
                self.node(node).children.get(&segment.name).copied()
            };
            node = match next {
                Some(id) => id,
                None => {
                    let id = self.add_node(node);
                    if segment.is_wildcard {
                        self.node_mut(node).wildcard = Some(id);
                    } else {
                        self.node_mut(node).children.insert(segment.name.clone(), id);
                    }
                    id
                }
            };
        }

        let suffix_wildcard = pattern.suffix_wildcard;
        let target = self.node_mut(node);
        let table = if suffix_wildcard {
            &mut target.globstar_handlers
        } else {
            &mut target.handlers
        };
        if table.contains_key(&method) {
            return Err(Error::DuplicateEndpoint(method, pattern.to_string()));
        }
        table.insert(method, Endpoint::new(pattern.param_bindings(), handler));

        self.routes.push((method, pattern));
        Ok(())
    }

    /// Find the endpoint for `method` and the decoded path `segments`.
    ///
    /// Literal children are preferred over the wildcard child, and a globstar
    /// handler is only used once no deeper path can finish, so the deepest
    /// matching `**` wins.
    pub fn resolve(&self, method: Method, segments: &[String]) -> Option<RouteMatch<'_>> {
        self.dfs(method, Self::ROOT, segments, 0)
    }

    fn dfs(&self, method: Method, id: NodeId, segments: &[String], i: usize) -> Option<RouteMatch<'_>> {
        let node = self.node(id);

        if i == segments.len() {
            return node.handlers.get(&method).map(|endpoint| RouteMatch {
                endpoint,
                globstar: false,
                node: id,
            });
        }

        if let Some(&child) = node.children.get(&segments[i]) {
            if let Some(found) = self.dfs(method, child, segments, i + 1) {
                return Some(found);
            }
        }

        if let Some(child) = node.wildcard {
            if let Some(found) = self.dfs(method, child, segments, i + 1) {
                return Some(found);
            }
        }

        node.globstar_handlers.get(&method).map(|endpoint| RouteMatch {
            endpoint,
            globstar: true,
            node: id,
        })
    }
}
