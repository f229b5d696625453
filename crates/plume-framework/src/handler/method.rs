//! Bot methods invoked with resolved parameters.

use std::sync::Arc;

/// A bot method taking the bot as an `Arc` receiver followed by its resolved
/// parameters.
///
/// Implemented for every `Fn(Arc<B>, T1, .., Tn) -> R` with up to 12
/// parameters, so both `Self::get_response` (declared with a
/// `self: Arc<Self>` receiver) and closures can be registered.
pub trait HandlerMethod<B, Args, R>: Send + Sync + 'static {
    /// Calls the method.
    fn call(&self, bot: Arc<B>, args: Args) -> R;
}

/// Macro to generate HandlerMethod implementations for methods with different arities.
macro_rules! impl_handler_method {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, B, R, $($ty,)*> HandlerMethod<B, ($($ty,)*), R> for F
        where
            F: Fn(Arc<B>, $($ty,)*) -> R + Send + Sync + 'static,
        {
            fn call(&self, bot: Arc<B>, args: ($($ty,)*)) -> R {
                let ($($ty,)*) = args;
                (self)(bot, $($ty,)*)
            }
        }
    };
}

impl_handler_method!();
impl_handler_method!(T1);
impl_handler_method!(T1, T2);
impl_handler_method!(T1, T2, T3);
impl_handler_method!(T1, T2, T3, T4);
impl_handler_method!(T1, T2, T3, T4, T5);
impl_handler_method!(T1, T2, T3, T4, T5, T6);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler_method!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
