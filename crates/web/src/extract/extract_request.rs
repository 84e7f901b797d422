//! Resolvers for the parts of the request itself and the built-in injectables.
//!
//! These are cloned out of the context so handlers can take them by value
//! next to the `&mut RequestContext` they also receive.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::extract::FromContext;
use crate::logger::Logger;
use crate::{PathParams, RemoteAddr, RequestContext};

impl FromContext for Method {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.method().clone()
    }
}

impl FromContext for Uri {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.uri().clone()
    }
}

impl FromContext for HeaderMap {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.headers().clone()
    }
}

/// The collected request body; empty for GET, HEAD and DELETE requests.
impl FromContext for Bytes {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.body().clone()
    }
}

impl FromContext for PathParams {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.path_params().clone()
    }
}

impl FromContext for Option<RemoteAddr> {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.remote_addr()
    }
}

impl FromContext for Logger {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.logger()
    }
}
