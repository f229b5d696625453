//! Auto-constructed data types.
//!
//! A plain data type (fields only, each with an optional default) can be
//! requested as a parameter without any context entry or factory: the
//! resolver resolves each field as a parameter of its own and builds the value.
//! Fields are looked up in the same context first, so a context entry named
//! after a field overrides that field's default.
//!
//! [`Injectable`] is normally derived:
//!
//! ```rust,ignore
//! #[derive(Clone, Injectable)]
//! struct Config {
//!     #[inject(default = "Claude-3-Haiku".to_string())]
//!     decision_bot: String,
//!     #[inject(default)]
//!     retries: u32,
//!     #[inject(auto)]
//!     limits: Limits,
//! }
//! ```

use std::sync::Arc;

use crate::context::Value;
use crate::error::ResolveResult;
use crate::param::{Resolved, Signature};

/// A data type the resolver can construct from its own declared fields.
pub trait Injectable: Clone + Send + Sync + Sized + 'static {
    /// Declarations of the constructor parameters, one per field.
    fn signature() -> Signature;

    /// Builds the value from its resolved fields.
    fn construct(resolved: &mut Resolved) -> ResolveResult<Self>;
}

/// Erased handle on an [`Injectable`] type.
#[derive(Clone, Copy)]
pub struct DataType {
    type_name: &'static str,
    signature: fn() -> Signature,
    construct: fn(Resolved) -> ResolveResult<Value>,
}

impl DataType {
    /// Returns the handle for `T`.
    pub fn of<T: Injectable>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            signature: T::signature,
            construct: construct_erased::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declarations of the type's fields.
    pub fn signature(&self) -> Signature {
        (self.signature)()
    }

    /// Builds an instance from resolved fields.
    pub fn construct(&self, resolved: Resolved) -> ResolveResult<Value> {
        (self.construct)(resolved)
    }
}

impl std::fmt::Debug for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DataType").field(&self.type_name).finish()
    }
}

fn construct_erased<T: Injectable>(mut resolved: Resolved) -> ResolveResult<Value> {
    T::construct(&mut resolved).map(|value| Arc::new(value) as Value)
}
