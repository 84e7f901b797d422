//! Request handling module that gives handlers access to the request and its scope.
//!
//! This module contains the per-request types of the framework:
//! - `RequestContext`: the request head and body, the bound path parameters,
//!   the injection registry and the response envelope of one request
//! - `PathParams`: URL path parameters bound by the matched route
//! - `RemoteAddr`: the peer address, attached by the hosting server

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};
use mime::Mime;
use tracing::debug;

use crate::envelope::Envelope;
use crate::inject::Injector;
use crate::logger::Logger;

/// The peer address of the connection a request arrived on.
///
/// The hosting server stores it as a request extension; the dispatcher
/// itself never requires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Everything one request owns while its handler chain runs.
///
/// A context is built fresh by the dispatcher for each matched request and
/// dropped once the response is rendered; it is never shared between
/// requests.
#[derive(Debug)]
pub struct RequestContext {
    head: Parts,
    body: Bytes,
    path_params: PathParams,
    injector: Injector,
    envelope: Envelope,
}

impl RequestContext {
    /// Creates a context for `request` with the given bound parameters, an
    /// empty injection registry and a success envelope.
    pub fn new(request: Request<Bytes>, path_params: PathParams) -> Self {
        let (head, body) = request.into_parts();
        Self { head, body, path_params, injector: Injector::new(), envelope: Envelope::default() }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the path of the request URI
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the parsed `Content-Type` header, if present and well formed.
    pub fn content_type(&self) -> Option<Mime> {
        self.head.headers.get(CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    /// Returns the raw request body; empty for GET, HEAD and DELETE requests.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the peer address, when the hosting server recorded one.
    pub fn remote_addr(&self) -> Option<RemoteAddr> {
        self.head.extensions.get::<RemoteAddr>().copied()
    }

    /// Returns the path parameters bound by the matched route
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns the raw value of path parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Converts path parameter `name` into `T`.
    ///
    /// A missing parameter or a value that does not parse yields
    /// `T::default()` rather than an error. Handlers that must distinguish
    /// `"0"` from `"abc"` should read [`param`](Self::param) and parse it
    /// themselves.
    pub fn param_as<T: FromStr + Default>(&self, name: &str) -> T {
        let Some(raw) = self.param(name) else {
            debug!(target: "cosine::request", param = name, "path parameter absent, using default");
            return T::default();
        };

        raw.parse().unwrap_or_else(|_| {
            debug!(target: "cosine::request", param = name, value = raw, "path parameter not convertible, using default");
            T::default()
        })
    }

    pub fn param_as_string(&self, name: &str) -> String {
        self.param(name).map(str::to_owned).unwrap_or_default()
    }

    pub fn param_as_i32(&self, name: &str) -> i32 {
        self.param_as(name)
    }

    pub fn param_as_i64(&self, name: &str) -> i64 {
        self.param_as(name)
    }

    pub fn param_as_f32(&self, name: &str) -> f32 {
        self.param_as(name)
    }

    pub fn param_as_f64(&self, name: &str) -> f64 {
        self.param_as(name)
    }

    /// Maps `value` into this request's injection registry, replacing any
    /// earlier value of the same type.
    pub fn map<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.injector.map(value)
    }

    /// Resolves `T` from the injection registry, falling back to `T::default()`.
    pub fn resolve<T: Clone + Default + Send + Sync + 'static>(&self) -> T {
        self.injector.resolve()
    }

    /// Returns the mapped value of type `T`, if any.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.injector.get()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.injector.get_mut()
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn injector_mut(&mut self) -> &mut Injector {
        &mut self.injector
    }

    /// The logger mapped by the dispatcher.
    pub fn logger(&self) -> Logger {
        self.resolve()
    }

    /// The response envelope handlers write their result into.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }
}

/// Parameters bound by a pattern match, keyed by parameter name.
///
/// Values are the raw path segments; no decoding or conversion is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    kind: PathParamsKind,
}

/// Internal enum to represent either empty parameters or actual parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum PathParamsKind {
    #[default]
    None,
    Params(HashMap<String, String>),
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        match &self.kind {
            PathParamsKind::Params(params) => params.get(name).map(String::as_str),
            PathParamsKind::None => None,
        }
    }

    /// Iterates over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let inner = match &self.kind {
            PathParamsKind::Params(params) => Some(params.iter()),
            PathParamsKind::None => None,
        };
        inner.into_iter().flatten().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(params: HashMap<String, String>) -> Self {
        if params.is_empty() { Self::empty() } else { Self { kind: PathParamsKind::Params(params) } }
    }
}
