//! Route table and matcher.
//!
//! Routes are registered on a [`RouterBuilder`] during start-up and compiled
//! by [`RouterBuilder::build`]. The resulting [`Router`] has no mutating API:
//! it is built once, then shared read-only between all requests.
//!
//! Matching is strictly ordered. For each route of the request method, in
//! registration order, the raw pattern is first compared to the path
//! literally and then matched segment by segment; the first route that
//! matches either way wins. More specific patterns are *not* preferred, so
//! register them before the general ones.
//!
//! # Example
//!
//! ```
//! use cosine::{handler_fn, RequestContext, Router};
//! use http::Method;
//!
//! fn show_user(ctx: &mut RequestContext) {
//!     let id = ctx.param_as_i64("id");
//!     ctx.envelope_mut().set_data(id);
//! }
//!
//! let router = Router::builder()
//!     .get("/users/:id", handler_fn(show_user))
//!     .build()
//!     .unwrap();
//!
//! let matched = router.at(&Method::GET, "/users/42").unwrap();
//! assert_eq!(matched.params().get("id"), Some("42"));
//! ```

mod error;
pub mod pattern;

pub use error::RouterError;
pub use pattern::RoutePattern;

use std::collections::HashMap;
use std::fmt;

use http::Method;
use tracing::trace;

use crate::PathParams;
use crate::handler::{IntoHandlers, SharedHandler};
use pattern::split_path;

/// The immutable route table.
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

/// A registered route: a compiled pattern and its ordered handler chain.
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    handlers: Vec<SharedHandler>,
}

/// Result of a successful match.
pub struct RouteMatch<'router> {
    route: &'router Route,
    params: PathParams,
}

impl Router {
    /// Creates a new, empty router builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches `method` and `path` against the route table.
    ///
    /// Returns `None` when the method has no routes or no route matches,
    /// which is distinct from a match that bound no parameters.
    pub fn at<'router>(&'router self, method: &Method, path: &str) -> Option<RouteMatch<'router>> {
        let routes = self.routes.get(method)?;

        let segments = split_path(path);
        for route in routes {
            if route.pattern.raw() == path {
                return Some(RouteMatch { route, params: PathParams::empty() });
            }

            if let Some(params) = route.pattern.matches(&segments) {
                return Some(RouteMatch { route, params });
            }
        }

        trace!(%method, path, "no route matched");
        None
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map_or(&[], Vec::as_slice)
    }

    /// Total number of registered routes, implicit `HEAD` routes included.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Returns true if no route has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// The route's own handlers, without global middleware.
    pub fn handlers(&self) -> &[SharedHandler] {
        &self.handlers
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.raw())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<'router> RouteMatch<'router> {
    /// The matched route.
    pub fn route(&self) -> &'router Route {
        self.route
    }

    /// The handler chain of the matched route.
    pub fn handlers(&self) -> &'router [SharedHandler] {
        &self.route.handlers
    }

    /// Parameters bound by the match.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Consumes the match, keeping only the bound parameters.
    pub fn into_params(self) -> PathParams {
        self.params
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("route", self.route).field("params", &self.params).finish()
    }
}

/// Collects route registrations during start-up.
///
/// Patterns are compiled in [`build`](Self::build), which reports the first
/// malformed registration as a [`RouterError`].
pub struct RouterBuilder {
    pending: Vec<PendingRoute>,
    prefix: String,
}

struct PendingRoute {
    method: Method,
    path: String,
    handlers: Vec<SharedHandler>,
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        #[doc = concat!("Registers `handlers` for `", stringify!($method), "` requests on `path`.")]
        pub fn $name(self, path: &str, handlers: impl IntoHandlers) -> Self {
            self.route($method, path, handlers)
        }
    };
}

impl RouterBuilder {
    fn new() -> Self {
        Self { pending: Vec::new(), prefix: String::new() }
    }

    /// Registers `handlers` for `method` on `path`, prefixed by the current group.
    pub fn route(mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> Self {
        let path = format!("{}{}", self.prefix, path);
        self.pending.push(PendingRoute { method, path, handlers: handlers.into_handlers() });
        self
    }

    /// Registers `handlers` for `GET` and, with the identical chain, for `HEAD`.
    pub fn get(self, path: &str, handlers: impl IntoHandlers) -> Self {
        let handlers = handlers.into_handlers();
        self.route(Method::GET, path, handlers.clone()).route(Method::HEAD, path, handlers)
    }

    method_route!(head, Method::HEAD);
    method_route!(options, Method::OPTIONS);
    method_route!(post, Method::POST);
    method_route!(put, Method::PUT);
    method_route!(patch, Method::PATCH);
    method_route!(delete, Method::DELETE);

    /// Registers every route added by `f` under `prefix`.
    ///
    /// Groups nest: an inner group's prefix is appended to the outer one.
    pub fn group<F>(mut self, prefix: &str, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let outer = self.prefix.clone();
        self.prefix.push_str(prefix);
        let mut builder = f(self);
        builder.prefix = outer;
        builder
    }

    /// Compiles every registration into an immutable [`Router`].
    pub fn build(self) -> Result<Router, RouterError> {
        let mut routes: HashMap<Method, Vec<Route>> = HashMap::new();

        for PendingRoute { method, path, handlers } in self.pending {
            if handlers.is_empty() {
                return Err(RouterError::empty_handlers(method, path));
            }

            let pattern = RoutePattern::parse(&path)?;
            routes.entry(method.clone()).or_default().push(Route { method, pattern, handlers });
        }

        Ok(Router { routes })
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("pending", &self.pending.len()).field("prefix", &self.prefix).finish()
    }
}
