//! A JSON micro web framework with ordered routing and per-request injection.
//!
//! Routes map a method and a path pattern to an ordered chain of handlers.
//! A handler is a plain function taking the [`RequestContext`] first and any
//! number of injectable arguments after it:
//!
//! ```
//! use cosine::extract::Inject;
//! use cosine::{Dispatcher, RequestContext, Router, handler_fn, handlers};
//!
//! #[derive(Clone, Default)]
//! struct Session {
//!     user: String,
//! }
//!
//! fn authenticate(ctx: &mut RequestContext) {
//!     ctx.map(Session { user: "alice".into() });
//! }
//!
//! fn profile(ctx: &mut RequestContext, Inject(session): Inject<Session>) {
//!     let id = ctx.param_as_i64("id");
//!     ctx.envelope_mut().set_data((id, session.user));
//! }
//!
//! let router = Router::builder()
//!     .get("/users/:id", handlers![handler_fn(authenticate), handler_fn(profile)])
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::builder().router(router).build().unwrap();
//!
//! let request = http::Request::get("/users/7").body(bytes::Bytes::new()).unwrap();
//! assert_eq!(dispatcher.serve(request).status(), http::StatusCode::OK);
//! ```

mod dispatcher;
mod envelope;
mod fn_trait;
mod handler;
mod inject;
mod request;
mod server;
mod utils;

pub mod config;
pub mod extract;
pub mod logger;
pub mod router;

pub use config::Config;
pub use dispatcher::{Dispatcher, DispatcherBuildError, DispatcherBuilder, JSON_CONTENT_TYPE};
pub use envelope::Envelope;
pub use extract::{FromContext, Inject};
pub use fn_trait::FnTrait;
pub use handler::{FnHandler, Handler, IntoHandlers, SharedHandler, handler_fn};
pub use inject::Injector;
pub use logger::{LogLevel, Logger};
pub use request::{PathParams, RemoteAddr, RequestContext};
pub use router::{RouteMatch, Router, RouterBuilder, RouterError};
pub use server::{Server, ServerBuilder, ServerError};

/// The framework version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
