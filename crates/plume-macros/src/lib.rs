//! Procedural macros for the Plume bot framework.
//!
//! This crate provides:
//!
//! - `#[derive(Injectable)]` - Lets the resolver build a plain data type from
//!   its own fields
//!
//! The derive is re-exported by `plume-core` (feature `derive`, on by default)
//! and by the `plume` facade, so it is rarely depended on directly.

mod injectable;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Injectable` for a struct with named fields.
///
/// Every field becomes a parameter named after the field. When a handler
/// declares `Param::<T>::new("config").auto()`, the resolver resolves each
/// field like any other parameter (context entry, dependency, default, nested
/// data type) and builds the struct.
///
/// # Attributes
///
/// Struct level:
///
/// - `#[inject(crate = "path")]` - Path to `plume_core` (default: `::plume_core`)
///
/// Field level:
///
/// - `#[inject(default)]` - Fall back to `Default::default()`
/// - `#[inject(default = expr)]` - Fall back to `expr`, evaluated per resolution
/// - `#[inject(auto)]` - The field is itself an `Injectable` data type
/// - `#[inject(depends_on = expr)]` - Produce the field with a `DependsOn`
/// - `#[inject(name = "...")]` - Resolve the field under another name
///
/// # Example
///
/// ```rust,ignore
/// use plume_core::Injectable;
///
/// #[derive(Clone, Injectable)]
/// pub struct BestResponseConfig {
///     #[inject(default = "Claude-3-Haiku".to_string())]
///     pub decision_bot: String,
///     #[inject(default = vec!["GPT-4o".to_string()])]
///     pub candidates: Vec<String>,
///     #[inject(auto)]
///     pub limits: Limits,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match injectable::derive_injectable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
