//! Handlers and handler chains.
//!
//! A [`Handler`] is one step of a request's chain: it receives the
//! [`RequestContext`] and mutates it, typically by writing the envelope or
//! mapping a value for later handlers. Plain functions become handlers
//! through [`handler_fn`], which resolves every argument after the context
//! with [`FromContext`] before the call.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::RequestContext;
use crate::extract::FromContext;
use crate::fn_trait::FnTrait;

pub trait Handler: Send + Sync {
    fn call(&self, ctx: &mut RequestContext);
}

/// A handler shared between the routes and the middleware list that hold it.
pub type SharedHandler = Arc<dyn Handler>;

/// a `FnTrait` holder which represents any `Fn(&mut RequestContext, ...)`
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

impl<F, Args> std::fmt::Debug for FnHandler<F, Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

impl<F, Args> Handler for FnHandler<F, Args>
where
    F: FnTrait<Args> + Send + Sync,
    Args: FromContext,
{
    fn call(&self, ctx: &mut RequestContext) {
        let args = Args::from_context(ctx);
        self.f.call(ctx, args);
    }
}

/// Conversion into an ordered handler chain, accepted by every route
/// registration method.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<SharedHandler>;
}

impl<H> IntoHandlers for H
where
    H: Handler + 'static,
{
    fn into_handlers(self) -> Vec<SharedHandler> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for Vec<SharedHandler> {
    fn into_handlers(self) -> Vec<SharedHandler> {
        self
    }
}

/// Builds a handler chain from handlers run in the given order.
///
/// ```
/// use cosine::{handler_fn, handlers, RequestContext, Router};
///
/// fn authenticate(_ctx: &mut RequestContext) {}
/// fn list_users(_ctx: &mut RequestContext) {}
///
/// let router = Router::builder()
///     .get("/users", handlers![handler_fn(authenticate), handler_fn(list_users)])
///     .build()
///     .unwrap();
/// assert_eq!(router.len(), 2);
/// ```
#[macro_export]
macro_rules! handlers {
    ($($handler:expr),* $(,)?) => {
        ::std::vec![$(::std::sync::Arc::new($handler) as $crate::SharedHandler),*]
    };
}
