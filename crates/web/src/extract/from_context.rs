use crate::RequestContext;
use crate::extract::Inject;

/// Produces a handler argument from the request context.
pub trait FromContext: Sized {
    fn from_context(ctx: &RequestContext) -> Self;
}

impl FromContext for () {
    fn from_context(_ctx: &RequestContext) -> Self {}
}

impl<T> FromContext for Inject<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn from_context(ctx: &RequestContext) -> Self {
        Inject(ctx.resolve())
    }
}

impl<T> FromContext for Option<Inject<T>>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.get::<T>().cloned().map(Inject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use bytes::Bytes;
    use http::Request;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tenant(String);

    fn context() -> RequestContext {
        RequestContext::new(Request::new(Bytes::new()), PathParams::empty())
    }

    #[test]
    fn test_inject_defaults_when_absent() {
        let ctx = context();
        assert_eq!(Inject::<Tenant>::from_context(&ctx), Inject(Tenant::default()));
        assert_eq!(Option::<Inject<Tenant>>::from_context(&ctx), None);
    }

    #[test]
    fn test_inject_mapped_value() {
        let mut ctx = context();
        ctx.map(Tenant("acme".into()));

        assert_eq!(Inject::<Tenant>::from_context(&ctx).0, Tenant("acme".into()));
        assert_eq!(Option::<Inject<Tenant>>::from_context(&ctx).map(Inject::into_inner), Some(Tenant("acme".into())));
    }
}
