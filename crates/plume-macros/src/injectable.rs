//! `#[derive(Injectable)]` implementation.
//!
//! # Struct-level attributes `#[inject(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `crate` | `"plume::core"` | Path to the core crate (default `::plume_core`) |
//!
//! # Field-level attributes `#[inject(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `default` | Fall back to `Default::default()` |
//! | `default = expr` | Fall back to `expr` |
//! | `auto` | Field type is itself `Injectable` |
//! | `depends_on = expr` | Field produced by a `DependsOn` declaration |
//! | `name = "…"` | Parameter name (default: the field name) |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr, Path, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

/// How a field falls back when the context has no entry for it.
enum FieldDefault {
    None,
    Trait,
    Expr(Expr),
}

/// Per-field `#[inject(…)]` markers.
struct FieldAttrs {
    default: FieldDefault,
    auto: bool,
    depends_on: Option<Expr>,
    name: Option<String>,
}

impl Default for FieldAttrs {
    fn default() -> Self {
        Self {
            default: FieldDefault::None,
            auto: false,
            depends_on: None,
            name: None,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_injectable(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Injectable can only be derived for structs",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Injectable cannot be derived for unions",
            ));
        }
    };

    let mut params = Vec::new();
    let mut inits = Vec::new();

    match fields {
        Fields::Named(named) => {
            for field in &named.named {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let attrs = parse_field_attrs(&field.attrs)?;
                let ty = &field.ty;
                let param_name = attrs.name.clone().unwrap_or_else(|| ident.to_string());

                params.push(param_expr(&krate, ty, &param_name, attrs, field.span())?);
                inits.push(quote! {
                    #ident: resolved.take::<#ty>(#param_name)?
                });
            }
        }
        Fields::Unit => {}
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Injectable requires named fields; parameters are resolved by field name",
            ));
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = if matches!(fields, Fields::Unit) {
        quote! { Self }
    } else {
        quote! { Self { #(#inits,)* } }
    };

    Ok(quote! {
        impl #impl_generics #krate::Injectable for #name #ty_generics #where_clause {
            fn signature() -> #krate::Signature {
                let mut signature = #krate::Signature::new();
                #( signature.push(#params.into_spec()); )*
                signature
            }

            #[allow(unused_variables)]
            fn construct(
                resolved: &mut #krate::Resolved,
            ) -> #krate::ResolveResult<Self> {
                ::core::result::Result::Ok(#body)
            }
        }
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut krate: Option<Path> = None;

    for attr in attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit = meta.value()?.parse::<LitStr>()?;
                krate = Some(lit.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unknown struct attribute, expected `crate = \"…\"`"))
            }
        })?;
    }

    Ok(krate.unwrap_or_else(|| syn::parse_quote!(::plume_core)))
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                result.default = if meta.input.peek(syn::Token![=]) {
                    FieldDefault::Expr(meta.value()?.parse::<Expr>()?)
                } else {
                    FieldDefault::Trait
                };
            } else if meta.path.is_ident("auto") {
                result.auto = true;
            } else if meta.path.is_ident("depends_on") {
                result.depends_on = Some(meta.value()?.parse::<Expr>()?);
            } else if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error(
                    "unknown field attribute, expected one of: default, auto, depends_on, name",
                ));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

// ============================================================================
// Code generation
// ============================================================================

fn param_expr(
    krate: &Path,
    ty: &syn::Type,
    name: &str,
    attrs: FieldAttrs,
    span: proc_macro2::Span,
) -> syn::Result<TokenStream> {
    if attrs.auto && attrs.depends_on.is_some() {
        return Err(syn::Error::new(
            span,
            "`auto` and `depends_on` cannot be combined on one field",
        ));
    }

    let mut expr = quote! { #krate::Param::<#ty>::new(#name) };

    if let Some(dependency) = attrs.depends_on {
        expr = quote! { #expr.depends_on(#dependency) };
    }

    match attrs.default {
        FieldDefault::None => {}
        FieldDefault::Trait => {
            expr = quote! { #expr.default_with(<#ty as ::core::default::Default>::default) };
        }
        FieldDefault::Expr(value) => {
            expr = quote! { #expr.default_with(|| #value) };
        }
    }

    if attrs.auto {
        expr = quote! { #expr.auto() };
    }

    Ok(expr)
}
