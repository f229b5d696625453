//! # Plume Core
//!
//! The dependency resolution engine of the Plume bot framework.
//!
//! Handlers and dependency factories declare their parameters as typed
//! descriptors. Given a request-scoped [`Context`], the resolver produces a
//! value for every declared parameter by trying, in order:
//!
//! - an entry of the same name in the context;
//! - a declared dependency ([`DependsOn`]), resolved recursively;
//! - a declared default;
//! - an auto-constructed data type ([`Injectable`]).
//!
//! ```text
//! ┌──────────────┐     ┌──────────┐     ┌──────────────┐
//! │ Signature    │────▶│ Resolver │────▶│ Resolved     │
//! │ (Param<T>..) │     │          │     │ name → value │
//! └──────────────┘     └──────────┘     └──────────────┘
//!                        │      ▲
//!                        ▼      │
//!                   ┌──────────────────┐
//!                   │ Context + cache  │
//!                   └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use plume_core::{Context, DependsOn, Param, ParamList, solve_dependencies};
//!
//! fn get_base() -> u32 { 10 }
//! fn get_multiplier(base: u32) -> u32 { base * 2 }
//!
//! let params = Param::<u32>::new("multiplier").depends_on(DependsOn::new(
//!     Param::<u32>::new("base").depends_on(DependsOn::new((), get_base)),
//!     get_multiplier,
//! ));
//!
//! let resolved = solve_dependencies(&params.signature(), &Context::new()).await?;
//! assert_eq!(resolved.get::<u32>("multiplier")?, 20);
//! ```

extern crate self as plume_core;

pub mod cache;
pub mod context;
pub mod dependency;
pub mod error;
pub mod injectable;
pub mod param;
pub mod resolver;

pub use cache::ResolutionCache;
pub use context::{Context, Value};
pub use dependency::{Callable, Dependency, DependsOn, FactoryId};
pub use error::{BoxError, ResolveError, ResolveResult};
pub use injectable::{DataType, Injectable};
pub use param::{Param, ParamList, ParamSpec, Resolved, Signature};
pub use resolver::{solve_dependencies, solve_dependencies_blocking, solve_with_cache};

#[cfg(feature = "derive")]
pub use plume_macros::Injectable;

pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Context, DependsOn, Injectable, Param, ParamList, ResolveError, ResolveResult, Resolved,
        solve_dependencies,
    };
}
