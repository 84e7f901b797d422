use crate::RequestContext;
use crate::extract::FromContext;

macro_rules! impl_from_context_for_tuple {
    ($($param:ident)*) => {
        impl<$($param,)*> FromContext for ($($param,)*)
        where
            $($param: FromContext,)*
        {
            #[inline]
            fn from_context(ctx: &RequestContext) -> Self {
                ($($param::from_context(ctx),)*)
            }
        }
    }
}

impl_from_context_for_tuple! { A }
impl_from_context_for_tuple! { A B }
impl_from_context_for_tuple! { A B C }
impl_from_context_for_tuple! { A B C D }
impl_from_context_for_tuple! { A B C D E }
impl_from_context_for_tuple! { A B C D E F }
impl_from_context_for_tuple! { A B C D E F G }
impl_from_context_for_tuple! { A B C D E F G H }
impl_from_context_for_tuple! { A B C D E F G H I }
impl_from_context_for_tuple! { A B C D E F G H I J }
impl_from_context_for_tuple! { A B C D E F G H I J K }
impl_from_context_for_tuple! { A B C D E F G H I J K L }
