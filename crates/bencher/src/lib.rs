//! Route tables and request paths shared by the router benchmarks.

use cosine::{RequestContext, Router, handler_fn};
use http::Method;

#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    method: Method,
    path: &'static str,
}

impl TestCase {
    pub const fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self { name, method, path }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

fn noop(_ctx: &mut RequestContext) {}

/// A table shaped like a small REST api: literals first, parameter routes
/// after them and a catch-all wildcard last.
pub fn api_router() -> Router {
    let mut builder = Router::builder()
        .get("/", handler_fn(noop))
        .get("/health", handler_fn(noop))
        .group("/api/v1", |api| {
            api.get("/users", handler_fn(noop))
                .post("/users", handler_fn(noop))
                .get("/users/:id", handler_fn(noop))
                .put("/users/:id", handler_fn(noop))
                .delete("/users/:id", handler_fn(noop))
                .get("/users/:id/posts", handler_fn(noop))
                .get("/users/:id/posts/:post", handler_fn(noop))
                .get("/orgs/:org/repos/:repo/issues/:number", handler_fn(noop))
        });

    for index in 0..32 {
        let path = format!("/resource{index}/:id");
        builder = builder.get(&path, handler_fn(noop));
    }

    builder.get("/static/*", handler_fn(noop)).build().expect("benchmark routes are valid")
}

pub fn test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("root_exact", Method::GET, "/"),
        TestCase::new("literal", Method::GET, "/api/v1/users"),
        TestCase::new("one_param", Method::GET, "/api/v1/users/42"),
        TestCase::new("three_params", Method::GET, "/api/v1/orgs/rust-lang/repos/rust/issues/1"),
        TestCase::new("late_param", Method::GET, "/resource31/7"),
        TestCase::new("wildcard", Method::GET, "/static/js/app/main.js"),
        TestCase::new("not_found", Method::GET, "/missing/route"),
        TestCase::new("unknown_method", Method::PATCH, "/api/v1/users/42"),
    ]
}
