use crate::RequestContext;

/// Represents a handler function: the request context first, then any
/// number of resolved arguments.
pub trait FnTrait<Args> {
    fn call(&self, ctx: &mut RequestContext, args: Args);
}

/// impl `Fn` for `FnTrait`, From 0 resolved parameters to 12 parameters
///
/// for example, it will impl Fn(&mut RequestContext, A, B) like this:
///```ignore
/// impl<Func, A, B> FnTrait<(A, B)> for Func
///    where
///        Func: Fn(&mut RequestContext, A, B),
/// {
///    #[inline]
///    #[allow(non_snake_case)]
///    fn call(&self, ctx: &mut RequestContext, (A, B): (A, B)) {
///        (self)(ctx, A, B)
///    }
/// }
///```
macro_rules! impl_fn_trait_for_fn ({ $($param:ident)* } => {
    impl<Func, $($param,)*> FnTrait<($($param,)*)> for Func
    where
        Func: Fn(&mut RequestContext, $($param),*),
    {
        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ctx: &mut RequestContext, ($($param,)*): ($($param,)*)) {
            (self)(ctx, $($param,)*)
        }
    }
});

impl_fn_trait_for_fn! {}
impl_fn_trait_for_fn! { A }
impl_fn_trait_for_fn! { A B }
impl_fn_trait_for_fn! { A B C }
impl_fn_trait_for_fn! { A B C D }
impl_fn_trait_for_fn! { A B C D E }
impl_fn_trait_for_fn! { A B C D E F }
impl_fn_trait_for_fn! { A B C D E F G }
impl_fn_trait_for_fn! { A B C D E F G H }
impl_fn_trait_for_fn! { A B C D E F G H I }
impl_fn_trait_for_fn! { A B C D E F G H I J }
impl_fn_trait_for_fn! { A B C D E F G H I J K }
impl_fn_trait_for_fn! { A B C D E F G H I J K L }

#[cfg(test)]
mod tests {
    use crate::RequestContext;
    use crate::fn_trait::FnTrait;
    use http::{HeaderMap, Method};

    fn assert_is_fn_trait<Args, F: FnTrait<Args>>(_f: F) {
        // compiles only for handler-shaped functions
    }
    fn context_only(_ctx: &mut RequestContext) {}
    fn unit_arg(_ctx: &mut RequestContext, _a: ()) {}
    fn method_and_headers(_ctx: &mut RequestContext, _a1: Method, _a2: HeaderMap) {}
    fn three_args(_ctx: &mut RequestContext, _a1: Method, _a2: HeaderMap, _a3: ()) {}
    fn six_args(_ctx: &mut RequestContext, _a1: (), _a2: HeaderMap, _a3: (), _a4: (), _a5: (), _a6: ()) {}
    fn twelve_args(
        _ctx: &mut RequestContext,
        _a1: Method,
        _a2: HeaderMap,
        _a3: (),
        _a4: (),
        _a5: (),
        _a6: (),
        _a7: (),
        _a8: (),
        _a9: (),
        _a10: (),
        _a11: (),
        _a12: (),
    ) {
    }

    #[test]
    fn test_fn_items_of_every_arity() {
        assert_is_fn_trait(context_only);
        assert_is_fn_trait(unit_arg);
        assert_is_fn_trait(method_and_headers);
        assert_is_fn_trait(three_args);
        assert_is_fn_trait(six_args);
        assert_is_fn_trait(twelve_args);
    }

    #[test]
    fn test_closure_is_fn_trait() {
        assert_is_fn_trait(|ctx: &mut RequestContext, method: Method| {
            ctx.envelope_mut().set_data(method.as_str());
        });
    }
}
