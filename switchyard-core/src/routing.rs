//! Segment trie router.
//!
//! Routes are stored in one trie per HTTP method. Each node represents one
//! path segment and may hold:
//!
//! - any number of static children keyed by their literal text,
//! - at most one parameter child (`:name`),
//! - at most one terminal wildcard child (`*name`),
//! - the route value when a pattern ends exactly at this node.
//!
//! Matching walks the request path one segment at a time with the precedence
//! static > parameter > wildcard and never backtracks, so a lookup costs
//! `O(segments)` regardless of how many routes are registered.
//!
//! ```text
//! Pattern: /users/:id          /users/42        match, id = "42"
//! Pattern: /users/new          /users/new       match (wins over :id)
//! Pattern: /files/*filepath    /files/a/b/c     match, filepath = "a/b/c"
//!                              /files           no match
//! ```

use crate::logging::{debug, trace};
use crate::route_params::decode_segment;
use crate::{HttpMethod, Params, RouteError};
use std::collections::HashMap;

/// One parsed component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

/// Split a pattern into segment specs, rejecting malformed ones.
fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteError::invalid(pattern, "empty parameter name"));
            }
            segments.push(Segment::Param(name.to_string()));
        } else if let Some(name) = part.strip_prefix('*') {
            if name.is_empty() {
                return Err(RouteError::invalid(pattern, "empty wildcard name"));
            }
            if i + 1 != parts.len() {
                return Err(RouteError::invalid(
                    pattern,
                    format!("wildcard '*{}' must be the final segment", name),
                ));
            }
            segments.push(Segment::Wildcard(name.to_string()));
        } else {
            segments.push(Segment::Static(part.to_string()));
        }
    }

    Ok(segments)
}

/// Split a request path into its non-empty segments. `/` yields none.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Pattern and value stored where a route terminates.
#[derive(Debug)]
struct Leaf<T> {
    pattern: String,
    value: T,
}

#[derive(Debug)]
struct ParamChild<T> {
    name: String,
    node: Box<Node<T>>,
}

#[derive(Debug)]
struct WildcardChild<T> {
    name: String,
    leaf: Leaf<T>,
}

#[derive(Debug)]
struct Node<T> {
    statics: HashMap<String, Node<T>>,
    param: Option<ParamChild<T>>,
    wildcard: Option<WildcardChild<T>>,
    leaf: Option<Leaf<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            param: None,
            wildcard: None,
            leaf: None,
        }
    }
}

/// Why an insert was refused; turned into a [`RouteError`] by the router.
enum InsertError {
    Duplicate,
    Ambiguous(String),
}

fn param_clash(name: &str, existing: &str) -> InsertError {
    InsertError::Ambiguous(format!(
        "parameter ':{}' conflicts with existing ':{}' at the same position",
        name, existing
    ))
}

fn wildcard_clash(name: &str, existing: &str) -> InsertError {
    InsertError::Ambiguous(format!(
        "wildcard '*{}' conflicts with existing '*{}' at the same position",
        name, existing
    ))
}

impl<T> Node<T> {
    fn insert(&mut self, segments: &[Segment], leaf: Leaf<T>) -> Result<(), InsertError> {
        let Some((first, rest)) = segments.split_first() else {
            if self.leaf.is_some() {
                return Err(InsertError::Duplicate);
            }
            self.leaf = Some(leaf);
            return Ok(());
        };

        match first {
            Segment::Static(text) => self
                .statics
                .entry(text.clone())
                .or_default()
                .insert(rest, leaf),
            Segment::Param(name) => match &mut self.param {
                Some(child) if child.name != *name => Err(param_clash(name, &child.name)),
                Some(child) => child.node.insert(rest, leaf),
                None => {
                    let mut node = Box::<Node<T>>::default();
                    node.insert(rest, leaf)?;
                    self.param = Some(ParamChild {
                        name: name.clone(),
                        node,
                    });
                    Ok(())
                }
            },
            Segment::Wildcard(name) => match &self.wildcard {
                Some(existing) if existing.name == *name => Err(InsertError::Duplicate),
                Some(existing) => Err(wildcard_clash(name, &existing.name)),
                None => {
                    self.wildcard = Some(WildcardChild {
                        name: name.clone(),
                        leaf,
                    });
                    Ok(())
                }
            },
        }
    }

    /// Same verdict as `insert` without modifying the trie.
    fn check(&self, segments: &[Segment]) -> Result<(), InsertError> {
        let Some((first, rest)) = segments.split_first() else {
            return match self.leaf {
                Some(_) => Err(InsertError::Duplicate),
                None => Ok(()),
            };
        };

        match first {
            Segment::Static(text) => match self.statics.get(text) {
                Some(child) => child.check(rest),
                None => Ok(()),
            },
            Segment::Param(name) => match &self.param {
                Some(child) if child.name != *name => Err(param_clash(name, &child.name)),
                Some(child) => child.node.check(rest),
                None => Ok(()),
            },
            Segment::Wildcard(name) => match &self.wildcard {
                Some(existing) if existing.name == *name => Err(InsertError::Duplicate),
                Some(existing) => Err(wildcard_clash(name, &existing.name)),
                None => Ok(()),
            },
        }
    }

    /// Greedy walk: once a static/param/wildcard branch is taken it is not
    /// retried, so a dead end below it is a miss.
    fn lookup(&self, segments: &[&str], params: &mut Params) -> Option<&Leaf<T>> {
        let mut node = self;

        for (i, segment) in segments.iter().enumerate() {
            if let Some(child) = node.statics.get(*segment) {
                node = child;
            } else if let Some(param) = &node.param {
                params.push(param.name.as_str(), decode_segment(segment));
                node = &param.node;
            } else if let Some(wildcard) = &node.wildcard {
                let rest: Vec<_> = segments[i..].iter().map(|s| decode_segment(s)).collect();
                params.push(wildcard.name.as_str(), rest.join("/"));
                return Some(&wildcard.leaf);
            } else {
                return None;
            }
        }

        node.leaf.as_ref()
    }

    fn collect_routes(&self, method: HttpMethod, out: &mut Vec<RouteInfo>) {
        if let Some(leaf) = &self.leaf {
            out.push(RouteInfo::new(method, &leaf.pattern));
        }
        let mut keys: Vec<&String> = self.statics.keys().collect();
        keys.sort();
        for key in keys {
            self.statics[key].collect_routes(method, out);
        }
        if let Some(param) = &self.param {
            param.node.collect_routes(method, out);
        }
        if let Some(wildcard) = &self.wildcard {
            out.push(RouteInfo::new(method, &wildcard.leaf.pattern));
        }
    }
}

/// A registered (method, pattern) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: HttpMethod,
    pub pattern: String,
}

impl RouteInfo {
    fn new(method: HttpMethod, pattern: &str) -> Self {
        Self {
            method,
            pattern: pattern.to_string(),
        }
    }
}

/// Outcome of a lookup.
#[derive(Debug)]
pub enum RouteMatch<'r, T> {
    /// A route matched; `params` holds the captures.
    Found { value: &'r T, params: Params },
    /// The path exists, but only under other methods.
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    /// No method has a route for this path.
    NotFound,
}

fn route_error(err: InsertError, method: HttpMethod, pattern: &str) -> RouteError {
    match err {
        InsertError::Duplicate => RouteError::Conflict {
            method,
            pattern: pattern.to_string(),
        },
        InsertError::Ambiguous(reason) => RouteError::invalid(pattern, reason),
    }
}

/// Method-keyed collection of segment tries.
///
/// Built during a single-threaded registration phase and read-only while
/// serving; lookups take `&self` and need no synchronization.
#[derive(Debug)]
pub struct Router<T> {
    trees: HashMap<HttpMethod, Node<T>>,
    len: usize,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            len: 0,
        }
    }

    /// Register `value` for `method` + `pattern`.
    ///
    /// Fails with [`RouteError::Conflict`] when the exact pair exists and with
    /// [`RouteError::InvalidPattern`] for misplaced wildcards, empty names, or
    /// a parameter/wildcard name that differs from one already registered at
    /// the same position.
    pub fn insert(&mut self, method: HttpMethod, pattern: &str, value: T) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        let leaf = Leaf {
            pattern: pattern.to_string(),
            value,
        };

        self.trees
            .entry(method)
            .or_default()
            .insert(&segments, leaf)
            .map_err(|err| route_error(err, method, pattern))?;

        self.len += 1;
        debug!(method = %method, pattern = %pattern, "Registered route");
        Ok(())
    }

    /// Whether `insert` would accept `method` + `pattern`, without
    /// registering anything.
    pub fn check(&self, method: HttpMethod, pattern: &str) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        match self.trees.get(&method) {
            Some(tree) => tree
                .check(&segments)
                .map_err(|err| route_error(err, method, pattern)),
            None => Ok(()),
        }
    }

    /// Resolve a request path for `method`.
    pub fn find(&self, method: HttpMethod, path: &str) -> RouteMatch<'_, T> {
        let segments = split_path(path);

        if let Some(tree) = self.trees.get(&method) {
            let mut params = Params::new();
            if let Some(leaf) = tree.lookup(&segments, &mut params) {
                trace!(method = %method, path = %path, pattern = %leaf.pattern, "Route matched");
                return RouteMatch::Found {
                    value: &leaf.value,
                    params,
                };
            }
        }

        let allowed: Vec<HttpMethod> = HttpMethod::ALL
            .into_iter()
            .filter(|m| *m != method)
            .filter(|m| {
                self.trees
                    .get(m)
                    .is_some_and(|tree| tree.lookup(&segments, &mut Params::new()).is_some())
            })
            .collect();

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allowed }
        }
    }

    /// All registered routes, grouped by method in canonical order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::with_capacity(self.len);
        for method in HttpMethod::ALL {
            if let Some(tree) = self.trees.get(&method) {
                tree.collect_routes(method, &mut out);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
