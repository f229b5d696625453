//! Dependency declarations.
//!
//! A [`DependsOn<T>`] pairs a factory with a cache flag. The factory declares
//! its own parameters the same way handlers do, so dependencies nest:
//!
//! ```rust,ignore
//! fn get_base() -> u32 { 10 }
//! fn get_multiplier(base: u32) -> u32 { base * 2 }
//!
//! let multiplier = DependsOn::new(
//!     Param::<u32>::new("base").depends_on(DependsOn::new((), get_base)),
//!     get_multiplier,
//! );
//!
//! // Asynchronous and fallible factories are declared with their own constructors.
//! let user = DependsOn::try_new_async(Param::<Db>::new("db"), load_user);
//! ```
//!
//! Factories without captured state (`fn` items and non-capturing closures)
//! are identified by their Rust type, so declaring `DependsOn::new((),
//! get_base)` in two places refers to the same factory and shares one cache
//! slot within a resolution pass. A factory that captures state is identified
//! by the declaration that wrapped it: clones of one `DependsOn` share a slot,
//! two declarations of the same closure type with different captures do not.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::context::Value;
use crate::error::{BoxError, ResolveError, ResolveResult};
use crate::param::{ParamList, Resolved, Signature};

// ============================================================================
// Callable - functions invoked with a tuple of resolved values
// ============================================================================

/// A function that can be invoked with a tuple of resolved parameter values.
///
/// Implemented for every `Fn` of up to 12 arguments whose argument tuple is
/// `Args`.
pub trait Callable<Args>: Send + Sync + 'static {
    /// The function's return type.
    type Output;

    /// Invokes the function.
    fn invoke(&self, args: Args) -> Self::Output;
}

/// Macro to generate Callable implementations for functions with different arities.
macro_rules! impl_callable {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, R, $($ty,)*> Callable<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> R + Send + Sync + 'static,
        {
            type Output = R;

            fn invoke(&self, args: ($($ty,)*)) -> R {
                let ($($ty,)*) = args;
                (self)($($ty,)*)
            }
        }
    };
}

impl_callable!();
impl_callable!(T1);
impl_callable!(T1, T2);
impl_callable!(T1, T2, T3);
impl_callable!(T1, T2, T3, T4);
impl_callable!(T1, T2, T3, T4, T5);
impl_callable!(T1, T2, T3, T4, T5, T6);
impl_callable!(T1, T2, T3, T4, T5, T6, T7);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ============================================================================
// FactoryId
// ============================================================================

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum FactoryKey {
    Type(TypeId),
    Instance(u64),
}

/// Identity of a factory, used as the resolution cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FactoryId {
    key: FactoryKey,
    name: &'static str,
}

impl FactoryId {
    /// Returns the identity of factory type `F`.
    pub fn of<F: 'static>() -> Self {
        Self {
            key: FactoryKey::Type(TypeId::of::<F>()),
            name: std::any::type_name::<F>(),
        }
    }

    /// Returns a fresh identity, distinct from every other.
    pub fn unique<F: 'static>() -> Self {
        Self {
            key: FactoryKey::Instance(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)),
            name: std::any::type_name::<F>(),
        }
    }

    /// Identity of the factory value `_factory`: its type when `F` carries no
    /// state, a fresh identity otherwise.
    pub fn for_factory<F: 'static>(_factory: &F) -> Self {
        if std::mem::size_of::<F>() == 0 {
            Self::of::<F>()
        } else {
            Self::unique::<F>()
        }
    }

    /// Type name of the factory, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ============================================================================
// Dependency - erased declaration
// ============================================================================

type FactoryFn = Arc<dyn Fn(Resolved) -> BoxFuture<'static, ResolveResult<Value>> + Send + Sync>;

/// Type-erased form of [`DependsOn<T>`], as stored in a
/// [`ParamSpec`](crate::ParamSpec).
#[derive(Clone)]
pub struct Dependency {
    id: FactoryId,
    signature: Signature,
    run: FactoryFn,
    use_cache: bool,
}

impl Dependency {
    pub fn id(&self) -> FactoryId {
        self.id
    }

    /// The factory's own parameter declarations.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether results are shared through the resolution cache.
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Invokes the factory with its already resolved parameters.
    pub fn call(&self, resolved: Resolved) -> BoxFuture<'static, ResolveResult<Value>> {
        (self.run)(resolved)
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("factory", &self.id.name())
            .field("use_cache", &self.use_cache)
            .field("params", &self.signature.names().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// DependsOn<T>
// ============================================================================

/// Declares that a parameter of type `T` is produced by a factory.
///
/// Caching is enabled by default: within one resolution pass, every parameter
/// that depends on the same factory reuses the first computed value. The
/// check and the insert are separate steps, so siblings resolved concurrently
/// may each miss the cache and invoke the factory when it suspends before
/// finishing. Factories whose results are cached should therefore be
/// idempotent.
pub struct DependsOn<T> {
    inner: Dependency,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DependsOn<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for DependsOn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl<T: Clone + Send + Sync + 'static> DependsOn<T> {
    /// Declares a synchronous factory.
    pub fn new<P, F>(params: P, factory: F) -> Self
    where
        P: ParamList,
        F: Callable<P::Values, Output = T>,
    {
        Self::from_parts(FactoryId::for_factory(&factory), params, move |args| {
            future::ready(Ok::<T, ResolveError>(factory.invoke(args))).boxed()
        })
    }

    /// Declares a synchronous factory that can fail.
    pub fn try_new<P, F, E>(params: P, factory: F) -> Self
    where
        P: ParamList,
        F: Callable<P::Values, Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        Self::from_parts(FactoryId::for_factory(&factory), params, move |args| {
            let result = factory
                .invoke(args)
                .map_err(|e| ResolveError::Factory(e.into()));
            future::ready(result).boxed()
        })
    }

    /// Declares an asynchronous factory.
    pub fn new_async<P, F, Fut>(params: P, factory: F) -> Self
    where
        P: ParamList,
        F: Callable<P::Values, Output = Fut>,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::from_parts(FactoryId::for_factory(&factory), params, move |args| {
            factory.invoke(args).map(Ok::<T, ResolveError>).boxed()
        })
    }

    /// Declares an asynchronous factory that can fail.
    pub fn try_new_async<P, F, Fut, E>(params: P, factory: F) -> Self
    where
        P: ParamList,
        F: Callable<P::Values, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_parts(FactoryId::for_factory(&factory), params, move |args| {
            factory
                .invoke(args)
                .map(|result| result.map_err(|e| ResolveError::Factory(e.into())))
                .boxed()
        })
    }

    /// Enables or disables sharing of the factory result within a
    /// resolution pass.
    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.inner.use_cache = enabled;
        self
    }

    /// Shorthand for `use_cache(false)`.
    pub fn no_cache(self) -> Self {
        self.use_cache(false)
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn is_cached(&self) -> bool {
        self.inner.use_cache
    }

    /// Returns the erased declaration.
    pub fn into_dependency(self) -> Dependency {
        self.inner
    }

    fn from_parts<P, G>(id: FactoryId, params: P, call: G) -> Self
    where
        P: ParamList,
        G: Fn(P::Values) -> BoxFuture<'static, ResolveResult<T>> + Send + Sync + 'static,
    {
        let signature = params.signature();
        let run: FactoryFn = Arc::new(move |mut resolved: Resolved| {
            match params.extract(&mut resolved) {
                Ok(args) => call(args)
                    .map(|result| result.map(|value| Arc::new(value) as Value))
                    .boxed(),
                Err(err) => future::ready(Err(err)).boxed(),
            }
        });

        Self {
            inner: Dependency {
                id,
                signature,
                run,
                use_cache: true,
            },
            _marker: PhantomData,
        }
    }
}
