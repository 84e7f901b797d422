//! Handler argument resolution.
//!
//! Every argument after the [`RequestContext`](crate::RequestContext) in a
//! handler function is produced by [`FromContext`]. Resolution cannot fail:
//! values the request does not carry resolve to an empty or default value.

mod extract_request;
mod extract_tuple;
mod from_context;

use std::ops::{Deref, DerefMut};

pub use from_context::FromContext;

/// A value resolved from the request's injection registry.
///
/// Earlier handlers in the chain put values there with
/// [`RequestContext::map`](crate::RequestContext::map). When nothing of type
/// `T` was mapped, `Inject<T>` holds `T::default()`; ask for
/// `Option<Inject<T>>` to see the absence instead.
///
/// # Example
/// ```
/// # use cosine::extract::Inject;
/// # use cosine::RequestContext;
/// #[derive(Clone, Default)]
/// struct CurrentUser {
///     name: String,
/// }
///
/// fn greet(ctx: &mut RequestContext, Inject(user): Inject<CurrentUser>) {
///     ctx.envelope_mut().set_data(format!("hello, {}", user.name));
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inject<T>(pub T);

impl<T> Inject<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Inject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
