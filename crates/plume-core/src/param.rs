//! Parameter declarations.
//!
//! Handlers and factories declare their parameters up front as a tuple of
//! typed [`Param<T>`] descriptors. The descriptors carry the parameter name and
//! the rules the resolver may use for it; the resolver works on the erased
//! [`Signature`] and the typed values are pulled back out of a [`Resolved`]
//! map by [`ParamList::extract`].
//!
//! ```rust,ignore
//! let params = (
//!     Param::<Vec<ProtocolMessage>>::new("messages"),
//!     Param::<u32>::new("retries").with_default(3),
//!     Param::<Config>::new("config").auto(),
//!     Param::<Cache>::new("cache").depends_on(DependsOn::new((), create_cache)),
//! );
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::Value;
use crate::dependency::{Dependency, DependsOn};
use crate::error::{ResolveError, ResolveResult};
use crate::injectable::{DataType, Injectable};

type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

// ============================================================================
// ParamSpec / Signature - erased declarations
// ============================================================================

/// The erased resolution rules of one parameter.
#[derive(Clone)]
pub struct ParamSpec {
    name: Cow<'static, str>,
    type_name: &'static str,
    dependency: Option<Dependency>,
    default: Option<DefaultFn>,
    data: Option<DataType>,
}

impl ParamSpec {
    /// Name the parameter is resolved under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared Rust type of the parameter.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The declared dependency, if any.
    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    /// Produces a fresh copy of the declared default, if any.
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(|f| f())
    }

    /// The data type to auto-construct, if any.
    pub fn data_type(&self) -> Option<&DataType> {
        self.data.as_ref()
    }
}

impl std::fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("dependency", &self.dependency)
            .field("has_default", &self.default.is_some())
            .field("data", &self.data)
            .finish()
    }
}

/// Ordered list of parameter declarations of one handler or factory.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter declaration.
    pub fn push(&mut self, param: ParamSpec) {
        self.params.push(param);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamSpec> {
        self.params.iter()
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(ParamSpec::name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<Vec<ParamSpec>> for Signature {
    fn from(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a ParamSpec;
    type IntoIter = std::slice::Iter<'a, ParamSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

// ============================================================================
// Param<T> - typed declaration
// ============================================================================

/// Typed declaration of a single parameter.
///
/// Without any rule the parameter can only be satisfied by a context entry
/// of the same name. Rules are consulted in a fixed order: context entry,
/// declared dependency, default, auto-constructed data type.
pub struct Param<T> {
    spec: ParamSpec,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.spec, f)
    }
}

impl<T: Clone + Send + Sync + 'static> Param<T> {
    /// Declares a parameter named `name`.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            spec: ParamSpec {
                name: name.into(),
                type_name: std::any::type_name::<T>(),
                dependency: None,
                default: None,
                data: None,
            },
            _marker: PhantomData,
        }
    }

    /// Resolves the parameter through a factory when the context has no
    /// entry for it.
    pub fn depends_on(mut self, dependency: DependsOn<T>) -> Self {
        self.spec.dependency = Some(dependency.into_dependency());
        self
    }

    /// Falls back to `value` when the context has no entry for the parameter.
    pub fn with_default(self, value: T) -> Self {
        self.default_with(move || value.clone())
    }

    /// Falls back to a value produced by `f` on every resolution.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.spec.default = Some(Arc::new(move || Arc::new(f()) as Value));
        self
    }

    /// Returns the erased declaration.
    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    /// Consumes the descriptor, returning the erased declaration.
    pub fn into_spec(self) -> ParamSpec {
        self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }
}

impl<T: Injectable> Param<T> {
    /// Constructs `T` from its own declared fields when the context has no
    /// entry for the parameter.
    pub fn auto(mut self) -> Self {
        self.spec.data = Some(DataType::of::<T>());
        self
    }
}

// ============================================================================
// Resolved - resolver output
// ============================================================================

/// The resolver's output: parameter name → resolved value.
#[derive(Default)]
pub struct Resolved {
    values: HashMap<String, Value>,
}

impl Resolved {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value resolved for `name`.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a clone of the value resolved for `name`.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> ResolveResult<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ResolveError::unresolvable(name))?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ResolveError::type_mismatch::<T>(name))
    }

    /// Removes the value resolved for `name`, avoiding a clone when the value
    /// is not shared with the context.
    pub fn take<T: Clone + Send + Sync + 'static>(&mut self, name: &str) -> ResolveResult<T> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| ResolveError::unresolvable(name))?;
        let value = value.downcast::<T>().map_err(|original| {
            self.values.insert(name.to_owned(), original);
            ResolveError::type_mismatch::<T>(name)
        })?;
        Ok(Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Resolved {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Resolved").field("values", &names).finish()
    }
}

// ============================================================================
// ParamList - tuples of Param<T>
// ============================================================================

/// A statically declared parameter list.
///
/// Implemented for `()`, a single [`Param<T>`] and tuples of up to 12
/// [`Param`]s. `Values` is the tuple of resolved values handed to the
/// callable, in declaration order.
pub trait ParamList: Send + Sync + 'static {
    /// The typed values produced by [`extract`](Self::extract).
    type Values: Send + 'static;

    /// Returns the erased declarations in order.
    fn signature(&self) -> Signature;

    /// Pulls the typed values out of a resolution result.
    fn extract(&self, resolved: &mut Resolved) -> ResolveResult<Self::Values>;
}

impl ParamList for () {
    type Values = ();

    fn signature(&self) -> Signature {
        Signature::new()
    }

    fn extract(&self, _resolved: &mut Resolved) -> ResolveResult<Self::Values> {
        Ok(())
    }
}

impl<T: Clone + Send + Sync + 'static> ParamList for Param<T> {
    type Values = (T,);

    fn signature(&self) -> Signature {
        Signature::from(vec![self.spec.clone()])
    }

    fn extract(&self, resolved: &mut Resolved) -> ResolveResult<Self::Values> {
        Ok((resolved.take::<T>(self.name())?,))
    }
}

/// Macro to generate ParamList implementations for tuples of different arities.
macro_rules! impl_param_list {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<$($ty,)*> ParamList for ($(Param<$ty>,)*)
        where
            $( $ty: Clone + Send + Sync + 'static, )*
        {
            type Values = ($($ty,)*);

            fn signature(&self) -> Signature {
                let ($($ty,)*) = self;
                Signature::from(vec![$($ty.spec().clone(),)*])
            }

            fn extract(&self, resolved: &mut Resolved) -> ResolveResult<Self::Values> {
                let ($($ty,)*) = self;
                Ok(($(resolved.take::<$ty>($ty.name())?,)*))
            }
        }
    };
}

impl_param_list!(T1);
impl_param_list!(T1, T2);
impl_param_list!(T1, T2, T3);
impl_param_list!(T1, T2, T3, T4);
impl_param_list!(T1, T2, T3, T4, T5);
impl_param_list!(T1, T2, T3, T4, T5, T6);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_param_list!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
