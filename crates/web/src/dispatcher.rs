//! Request dispatch: from a complete request to a rendered JSON response.
//!
//! [`Dispatcher::serve`] is the whole request pipeline of the framework. It
//! normalizes the path, matches it against the [`Router`], runs the global
//! middleware followed by the route's own handlers against a fresh
//! [`RequestContext`], and renders the context's [`Envelope`].
//!
//! Every handler of the chain runs; a handler cannot stop the chain. Handlers
//! that need to short-circuit record their outcome in the envelope or in the
//! injection registry and later handlers check it.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use thiserror::Error;
use tracing::{error, trace};

use crate::envelope::Envelope;
use crate::handler::{IntoHandlers, SharedHandler};
use crate::logger::{LogLevel, Logger};
use crate::router::Router;
use crate::{RemoteAddr, RequestContext};

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

pub struct Dispatcher {
    router: Router,
    middlewares: Vec<SharedHandler>,
    logger: Logger,
}

#[derive(Error, Debug)]
pub enum DispatcherBuildError {
    #[error("router must be set")]
    MissingRouter,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn middlewares(&self) -> &[SharedHandler] {
        &self.middlewares
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Handles one request whose body has already been collected.
    pub fn serve(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        if self.logger.enabled(LogLevel::Debug) {
            let remote = request.extensions().get::<RemoteAddr>().map(|addr| addr.0.to_string()).unwrap_or_default();
            self.logger.emit(LogLevel::Debug, &[&remote, &"-", request.method(), &"-", request.uri()]);
        }

        let path = request.uri().path();
        if path.len() > 1 && path.ends_with('/') {
            return redirect(request.uri());
        }

        let Some(matched) = self.router.at(request.method(), path) else {
            return render(&Envelope::not_found());
        };

        let route_handlers = matched.handlers();
        let mut ctx = RequestContext::new(request, matched.into_params());
        ctx.map(self.logger.clone());

        for handler in self.middlewares.iter().chain(route_handlers) {
            handler.call(&mut ctx);
        }

        render(ctx.envelope())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("middlewares", &self.middlewares.len())
            .field("logger", &self.logger)
            .finish()
    }
}

/// `301` to the same URI without its single trailing `/`.
fn redirect(uri: &Uri) -> Response<Full<Bytes>> {
    let path = uri.path();
    let trimmed = &path[..path.len() - 1];
    let location = match uri.query() {
        Some(query) => format!("{trimmed}?{query}"),
        None => trimmed.to_owned(),
    };

    let location = match HeaderValue::try_from(location) {
        Ok(location) => location,
        Err(e) => {
            error!(cause = %e, %uri, "redirect location is not a valid header value");
            return render(&Envelope::error());
        }
    };

    trace!(%uri, ?location, "redirecting trailing slash");
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    response.headers_mut().insert(LOCATION, location);
    response
}

pub(crate) fn render(envelope: &Envelope) -> Response<Full<Bytes>> {
    let (status, body) = match envelope.to_json() {
        Ok(body) => (envelope.status(), body),
        Err(e) => {
            error!(cause = %e, "failed to serialize response envelope");
            let fallback = Envelope::error();
            (fallback.status(), fallback.to_json().unwrap_or_default())
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

/// Assembles a [`Dispatcher`] during start-up.
pub struct DispatcherBuilder {
    router: Option<Router>,
    middlewares: Vec<SharedHandler>,
    logger: Option<Logger>,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { router: None, middlewares: Vec::new(), logger: None }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Appends global middleware, run before every matched route's handlers
    /// in the order it was added.
    pub fn middleware(mut self, handlers: impl IntoHandlers) -> Self {
        self.middlewares.extend(handlers.into_handlers());
        self
    }

    /// The logger mapped into every request; a console logger at
    /// [`LogLevel::All`] when not set.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatcherBuildError> {
        let router = self.router.ok_or(DispatcherBuildError::MissingRouter)?;
        Ok(Dispatcher { router, middlewares: self.middlewares, logger: self.logger.unwrap_or_default() })
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("router", &self.router)
            .field("middlewares", &self.middlewares.len())
            .field("logger", &self.logger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Inject;
    use crate::{PathParams, handler_fn, handlers};
    use http::Method;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Trail(Vec<&'static str>);

    #[derive(Debug, Clone, Default)]
    struct User(String);

    fn push(ctx: &mut RequestContext, step: &'static str) {
        let mut trail = ctx.resolve::<Trail>();
        trail.0.push(step);
        ctx.map(trail);
    }

    fn middleware(ctx: &mut RequestContext) {
        push(ctx, "middleware");
        ctx.map(User("alice".into()));
    }

    fn show_user(ctx: &mut RequestContext, Inject(user): Inject<User>, params: PathParams) {
        push(ctx, "show_user");
        let trail = ctx.resolve::<Trail>();
        ctx.envelope_mut().set_data(json!({
            "id": params.get("id"),
            "user": user.0,
            "trail": trail.0,
        }));
    }

    fn forbid(ctx: &mut RequestContext) {
        ctx.envelope_mut().set_forbidden();
    }

    fn custom_code(ctx: &mut RequestContext) {
        ctx.envelope_mut().set_exception(1001, "business rule violated");
    }

    fn echo_body(ctx: &mut RequestContext, body: Bytes) {
        ctx.envelope_mut().set_data(String::from_utf8_lossy(&body));
    }

    fn dispatcher() -> Dispatcher {
        let router = Router::builder()
            .get("/users/:id", handler_fn(show_user))
            .get("/admin", handlers![handler_fn(forbid)])
            .get("/custom", handler_fn(custom_code))
            .post("/echo", handler_fn(echo_body))
            .build()
            .unwrap();
        Dispatcher::builder().router(router).middleware(handler_fn(middleware)).build().unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_build_requires_router() {
        assert!(matches!(Dispatcher::builder().build(), Err(DispatcherBuildError::MissingRouter)));
    }

    #[tokio::test]
    async fn test_chain_order_and_injection() {
        let response = dispatcher().serve(request(Method::GET, "/users/42"));

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[CONTENT_TYPE].to_str().unwrap().parse::<mime::Mime>().unwrap();
        assert_eq!(content_type.essence_str(), mime::APPLICATION_JSON.essence_str());
        assert_eq!(content_type.get_param(mime::CHARSET), Some(mime::UTF_8));

        assert_eq!(
            body_json(response).await,
            json!({
                "code": 200,
                "message": "",
                "data": {"id": "42", "user": "alice", "trail": ["middleware", "show_user"]},
            })
        );
    }

    #[tokio::test]
    async fn test_not_found() {
        let dispatcher = dispatcher();

        for (method, uri) in [(Method::GET, "/nowhere"), (Method::PUT, "/users/42"), (Method::GET, "/users/1/x")] {
            let response = dispatcher.serve(request(method, uri));
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await, json!({"code": 404, "message": "API not found", "data": null}));
        }
    }

    #[test]
    fn test_trailing_slash_redirect() {
        let dispatcher = dispatcher();

        let response = dispatcher.serve(request(Method::GET, "/users/42/"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/users/42");

        let response = dispatcher.serve(request(Method::GET, "/nowhere/?page=2"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/nowhere?page=2");

        let response = dispatcher.serve(request(Method::GET, "/users//"));
        assert_eq!(response.headers()[LOCATION], "/users/");
    }

    #[tokio::test]
    async fn test_root_is_not_redirected() {
        let response = dispatcher().serve(request(Method::GET, "/"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_follows_envelope() {
        let dispatcher = dispatcher();

        let response = dispatcher.serve(request(Method::GET, "/admin"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["message"], "API access forbidden");

        let response = dispatcher.serve(request(Method::GET, "/custom"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["code"], 1001);
    }

    #[test]
    fn test_head_uses_get_chain() {
        let response = dispatcher().serve(request(Method::HEAD, "/users/7"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_reaches_handler() {
        let request = Request::builder().method(Method::POST).uri("/echo").body(Bytes::from_static(b"ping")).unwrap();
        let response = dispatcher().serve(request);
        assert_eq!(body_json(response).await["data"], "ping");
    }

    #[tokio::test]
    async fn test_logger_is_injected() {
        fn level(ctx: &mut RequestContext, logger: Logger) {
            ctx.envelope_mut().set_data(logger.level().to_string());
        }

        let router = Router::builder().get("/level", handler_fn(level)).build().unwrap();
        let dispatcher = Dispatcher::builder().router(router).logger(Logger::console(LogLevel::Warn)).build().unwrap();

        let response = dispatcher.serve(request(Method::GET, "/level"));
        assert_eq!(body_json(response).await["data"], "warn");
    }

    #[tokio::test]
    async fn test_registry_is_per_request() {
        fn count(ctx: &mut RequestContext, Inject(seen): Inject<u32>) {
            ctx.map(seen + 1);
            ctx.envelope_mut().set_data(seen + 1);
        }

        let router = Router::builder().get("/count", handlers![handler_fn(count), handler_fn(count)]).build().unwrap();
        let dispatcher = Dispatcher::builder().router(router).build().unwrap();

        for _ in 0..3 {
            let response = dispatcher.serve(request(Method::GET, "/count"));
            assert_eq!(body_json(response).await["data"], 2);
        }
    }
}
